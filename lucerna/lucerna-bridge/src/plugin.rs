//! Lucerna plugin: implements RenderBackend for the host. Caches per-entity
//! GPU buffers and material textures, and drives the per-tick sequence:
//! shadow update, at most one probe precompute step, then the scene or the
//! debug probe viewer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lucerna_renderer::{upload_rgba_texture, LucernaConfig, MaterialViews, MeshDraw, Renderer};
use render_api::{ExtractedScene, FrameInput, RenderBackend, TextureData, VERTEX_STRIDE};

/// Cached GPU state for one mesh entity.
struct CachedMesh {
    vertex_buf: Arc<wgpu::Buffer>,
    vertex_count: u32,
    vertex_len: usize,
    transform: [f32; 16],
    textures: MaterialViews,
}

pub struct LucernaPlugin {
    renderer: Renderer,
    mesh_cache: HashMap<u64, CachedMesh>,
    default_specular: Arc<wgpu::TextureView>,
    default_normal: Arc<wgpu::TextureView>,
    /// Offscreen color target for headless render_frame, kept per size.
    offscreen: Option<(wgpu::Texture, (u32, u32))>,
}

fn solid_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    rgba: [u8; 4],
    label: &str,
) -> wgpu::Texture {
    let data = TextureData {
        data: rgba.to_vec(),
        width: 1,
        height: 1,
    };
    upload_rgba_texture(device, queue, &data, label)
}

fn color_to_rgba(color: [f32; 3]) -> [u8; 4] {
    [
        (color[0].clamp(0.0, 1.0) * 255.0) as u8,
        (color[1].clamp(0.0, 1.0) * 255.0) as u8,
        (color[2].clamp(0.0, 1.0) * 255.0) as u8,
        255,
    ]
}

impl LucernaPlugin {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Result<Self, String> {
        Self::new_with_config(device, queue, LucernaConfig::default())
    }

    pub fn new_with_config(
        device: wgpu::Device,
        queue: wgpu::Queue,
        config: LucernaConfig,
    ) -> Result<Self, String> {
        let default_specular =
            solid_texture(&device, &queue, [64, 64, 64, 255], "default_specular");
        let default_normal =
            solid_texture(&device, &queue, [128, 128, 255, 255], "default_normal");
        let default_specular = Arc::new(default_specular.create_view(&Default::default()));
        let default_normal = Arc::new(default_normal.create_view(&Default::default()));
        let renderer = Renderer::new(device, queue, config).map_err(|e| e.to_string())?;
        Ok(Self {
            renderer,
            mesh_cache: HashMap::new(),
            default_specular,
            default_normal,
            offscreen: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        self.renderer.device()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.renderer.queue()
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    fn material_views(&self, material: &render_api::MaterialTextures) -> MaterialViews {
        let device = self.renderer.device();
        let queue = self.renderer.queue();
        let diffuse = match &material.diffuse {
            Some(data) => Arc::new(
                upload_rgba_texture(device, queue, data, "mesh_diffuse")
                    .create_view(&Default::default()),
            ),
            None => Arc::new(
                solid_texture(device, queue, color_to_rgba(material.diffuse_color), "mesh_diffuse")
                    .create_view(&Default::default()),
            ),
        };
        let specular = match &material.specular {
            Some(data) => Arc::new(
                upload_rgba_texture(device, queue, data, "mesh_specular")
                    .create_view(&Default::default()),
            ),
            None => Arc::clone(&self.default_specular),
        };
        let normal = match &material.normal {
            Some(data) => Arc::new(
                upload_rgba_texture(device, queue, data, "mesh_normal")
                    .create_view(&Default::default()),
            ),
            None => Arc::clone(&self.default_normal),
        };
        MaterialViews {
            diffuse,
            specular,
            normal,
        }
    }

    fn mesh_draws(&self) -> Vec<MeshDraw> {
        self.mesh_cache
            .values()
            .map(|c| MeshDraw {
                vertex_buf: Arc::clone(&c.vertex_buf),
                vertex_count: c.vertex_count,
                transform: c.transform,
                textures: c.textures.clone(),
            })
            .collect()
    }

    /// Render one frame into `target`, or into the cached offscreen texture
    /// when the host has no window.
    fn render_frame_impl(
        &mut self,
        frame: &FrameInput,
        swapchain_view: Option<&wgpu::TextureView>,
    ) -> Result<(), String> {
        let meshes = self.mesh_draws();

        self.renderer.update_shadow(&meshes, &frame.sun);

        if frame.precompute_requested {
            self.renderer.trigger_precompute();
        }
        // At most one probe per tick; the whole pipeline for that probe runs
        // to completion (and stalls this tick) by design.
        self.renderer
            .precompute_step(&meshes, &frame.sun, &frame.spot, &frame.settings);

        let owned_view;
        let target_view = match swapchain_view {
            Some(view) => view,
            None => {
                let (width, height) = frame.view.viewport_size;
                let needs_new = match &self.offscreen {
                    Some((_, size)) => *size != (width, height),
                    None => true,
                };
                if needs_new {
                    let texture = self.renderer.device().create_texture(&wgpu::TextureDescriptor {
                        label: Some("lucerna_offscreen"),
                        size: wgpu::Extent3d {
                            width: width.max(1),
                            height: height.max(1),
                            depth_or_array_layers: 1,
                        },
                        mip_level_count: 1,
                        sample_count: 1,
                        dimension: wgpu::TextureDimension::D2,
                        format: self.renderer.config().swapchain_format,
                        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                        view_formats: &[],
                    });
                    self.offscreen = Some((texture, (width, height)));
                }
                let (texture, _) = self.offscreen.as_ref().expect("just ensured");
                owned_view = texture.create_view(&Default::default());
                &owned_view
            }
        };

        let mut encoder = self
            .renderer
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("lucerna_frame"),
            });
        if frame.settings.show_probe {
            self.renderer
                .encode_probe_debug(&mut encoder, target_view, &frame.settings)
                .map_err(|e| e.to_string())?;
        } else {
            self.renderer
                .encode_scene_frame(&mut encoder, target_view, frame, &meshes)
                .map_err(|e| e.to_string())?;
        }
        let cmd = encoder.finish();
        self.renderer.queue().submit([cmd]);
        Ok(())
    }

    pub fn render_frame_to_swapchain(
        &mut self,
        frame: &FrameInput,
        swapchain_view: &wgpu::TextureView,
    ) -> Result<(), String> {
        self.render_frame_impl(frame, Some(swapchain_view))
    }
}

impl RenderBackend for LucernaPlugin {
    fn prepare(&mut self, scene: &ExtractedScene) {
        if let Some(environment) = &scene.environment {
            self.renderer.set_environment(environment);
        }

        let current: HashSet<u64> = scene.meshes.keys().copied().collect();
        self.mesh_cache.retain(|k, _| current.contains(k));
        log::debug!("preparing {} extracted meshes", scene.meshes.len());

        for (&entity_id, mesh) in &scene.meshes {
            if !mesh.visible || mesh.vertex_data.is_empty() {
                continue;
            }
            let vertex_len = mesh.vertex_data.len();
            let vertex_count = (vertex_len as u64 / VERTEX_STRIDE) as u32;
            if let Some(cached) = self.mesh_cache.get_mut(&entity_id) {
                if cached.vertex_len == vertex_len {
                    self.renderer
                        .queue()
                        .write_buffer(&cached.vertex_buf, 0, &mesh.vertex_data);
                    cached.transform = mesh.transform;
                    continue;
                }
            }
            let vertex_buf = self.renderer.device().create_buffer(&wgpu::BufferDescriptor {
                label: Some("lucerna_mesh_vertex"),
                size: vertex_len as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.renderer.queue().write_buffer(&vertex_buf, 0, &mesh.vertex_data);
            let textures = self.material_views(&mesh.material);
            self.mesh_cache.insert(
                entity_id,
                CachedMesh {
                    vertex_buf: Arc::new(vertex_buf),
                    vertex_count,
                    vertex_len,
                    transform: mesh.transform,
                    textures,
                },
            );
        }
    }

    fn render_frame(&mut self, frame: &FrameInput) -> Result<(), String> {
        self.render_frame_impl(frame, None)
    }
}
