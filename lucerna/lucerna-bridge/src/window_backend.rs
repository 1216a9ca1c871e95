//! Window-capable backend: created from a window, implements
//! RenderBackendWindow. The surface is recreated each frame (wgpu::Surface
//! lifetime is tied to the window; this avoids transmute and
//! platform-specific staleness when the window is dragged/resized).

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use render_api::{ExtractedScene, FrameInput, RenderBackend, RenderBackendWindow};
use wgpu::SurfaceTargetUnsafe;

use crate::plugin::LucernaPlugin;
use lucerna_renderer::LucernaConfig;

pub struct LucernaWindowBackend {
    instance: wgpu::Instance,
    plugin: LucernaPlugin,
}

impl LucernaWindowBackend {
    /// Create a window-capable backend. The window is only used to get raw
    /// handles and an initial surface for adapter selection; the host must
    /// keep it alive and pass its raw handles each frame.
    pub fn from_window(
        window: &(impl HasWindowHandle + HasDisplayHandle),
    ) -> Result<Box<dyn RenderBackendWindow>, String> {
        let (raw_window, raw_display) = {
            let wh = window.window_handle().map_err(|e| e.to_string())?;
            let dh = window.display_handle().map_err(|e| e.to_string())?;
            (wh.as_raw(), dh.as_raw())
        };
        let backend = pollster::block_on(Self::from_raw_handles_async(raw_window, raw_display))?;
        Ok(Box::new(backend))
    }

    async fn from_raw_handles_async(
        raw_window_handle: raw_window_handle::RawWindowHandle,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
    ) -> Result<Self, String> {
        let instance = wgpu::Instance::default();
        let target = SurfaceTargetUnsafe::RawHandle {
            raw_window_handle,
            raw_display_handle,
        };
        let surface = unsafe { instance.create_surface_unsafe(target).map_err(|e| e.to_string())? };
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("unsupported platform: no compatible GPU adapter")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .map_err(|e| format!("unsupported platform: {e}"))?;
        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Rgba8Unorm);
        let config = LucernaConfig {
            swapchain_format: format,
            ..LucernaConfig::default()
        };
        let plugin = LucernaPlugin::new_with_config(device, queue, config)?;
        drop(surface);
        Ok(Self { instance, plugin })
    }

    fn surface_config(
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> wgpu::SurfaceConfiguration {
        wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }
}

impl RenderBackend for LucernaWindowBackend {
    fn prepare(&mut self, scene: &ExtractedScene) {
        self.plugin.prepare(scene);
    }

    fn render_frame(&mut self, frame: &FrameInput) -> Result<(), String> {
        self.plugin.render_frame(frame)
    }
}

impl RenderBackendWindow for LucernaWindowBackend {
    fn render_frame_to_window(
        &mut self,
        frame: &FrameInput,
        raw_window_handle: raw_window_handle::RawWindowHandle,
        raw_display_handle: raw_window_handle::RawDisplayHandle,
    ) -> Result<(), String> {
        let target = SurfaceTargetUnsafe::RawHandle {
            raw_window_handle,
            raw_display_handle,
        };
        let surface = unsafe {
            self.instance
                .create_surface_unsafe(target)
                .map_err(|e| e.to_string())?
        };
        let (width, height) = frame.view.viewport_size;
        let format = self.plugin.renderer().config().swapchain_format;
        let config = Self::surface_config(format, width.max(1), height.max(1));
        surface.configure(self.plugin.device(), &config);

        let surface_texture = match surface.get_current_texture() {
            Ok(t) => t,
            Err(wgpu::SurfaceError::Outdated) | Err(wgpu::SurfaceError::Lost) => {
                surface.configure(self.plugin.device(), &config);
                surface.get_current_texture().map_err(|e| e.to_string())?
            }
            Err(wgpu::SurfaceError::Timeout) => {
                return Err("surface get_current_texture timeout".to_string())
            }
            Err(e) => return Err(e.to_string()),
        };
        let view = surface_texture.texture.create_view(&Default::default());
        self.plugin.render_frame_to_swapchain(frame, &view)?;
        surface_texture.present();
        Ok(())
    }
}
