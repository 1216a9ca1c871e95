//! Living-room demo: load OBJ/MTL through mesh-obj, render with Lucerna,
//! precompute probes with the P key.
//!
//! Run from repo root: cargo run -p debug --bin living_room
//! Assets expected under assets/living_room/ and assets/environments/.
//!
//! Keys: P precompute sweep, L toggle probe markers, Tab toggle probe
//! viewer, [ / ] probe index, M cycle viewer channel, WASD + QE move,
//! arrows look.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use render_api::{
    DirectionalLight, ExtractedMesh, ExtractedScene, ExtractedView, FrameInput, MaterialTextures,
    ProbeChannel, RenderBackendWindow, RenderSettings, SpotLight, TextureData,
};
use winit::application::ApplicationHandler;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

fn load_image_rgba(path: &Path) -> Result<TextureData, String> {
    let img = image::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(TextureData {
        data: rgba.into_raw(),
        width,
        height,
    })
}

/// Interleave a parsed mesh into the renderer's vertex layout
/// (pos3 + normal3 + uv2 + tangent4).
fn interleave(mesh: &mesh_obj::MeshData) -> Vec<u8> {
    let count = mesh.vertex_count();
    let mut data = Vec::with_capacity(count * 48);
    for i in 0..count {
        let mut push = |v: f32| data.extend_from_slice(&v.to_le_bytes());
        push(mesh.positions[i * 3]);
        push(mesh.positions[i * 3 + 1]);
        push(mesh.positions[i * 3 + 2]);
        push(mesh.normals[i * 3]);
        push(mesh.normals[i * 3 + 1]);
        push(mesh.normals[i * 3 + 2]);
        push(mesh.uvs[i * 2]);
        push(mesh.uvs[i * 2 + 1]);
        push(mesh.tangents[i * 4]);
        push(mesh.tangents[i * 4 + 1]);
        push(mesh.tangents[i * 4 + 2]);
        push(mesh.tangents[i * 4 + 3]);
    }
    data
}

fn load_scene(asset_dir: &Path, model_transform: Mat4) -> Result<ExtractedScene, String> {
    let obj_text = std::fs::read_to_string(asset_dir.join("living_room.obj"))
        .map_err(|e| format!("living_room.obj: {e}"))?;
    let mtl_text = std::fs::read_to_string(asset_dir.join("living_room.mtl"))
        .map_err(|e| format!("living_room.mtl: {e}"))?;

    let objects = mesh_obj::parse_obj(&obj_text).map_err(|e| e.to_string())?;
    let materials = mesh_obj::parse_mtl(&mtl_text).map_err(|e| e.to_string())?;
    log::info!("loaded {} objects, {} materials", objects.len(), materials.len());

    let mut meshes = HashMap::new();
    for (i, object) in objects.iter().enumerate() {
        let material = materials.get(&object.material);
        let mut textures = MaterialTextures::default();
        if let Some(material) = material {
            textures.diffuse_color = material.diffuse;
            if let Some(map) = &material.diffuse_map {
                textures.diffuse = load_image_rgba(&asset_dir.join(map)).ok();
            }
            if let Some(map) = &material.specular_map {
                textures.specular = load_image_rgba(&asset_dir.join(map)).ok();
            }
            if let Some(map) = &material.normal_map {
                textures.normal = load_image_rgba(&asset_dir.join(map)).ok();
            }
        } else {
            textures.diffuse_color = [0.8, 0.8, 0.8];
        }

        let entity_id = i as u64 + 1;
        meshes.insert(
            entity_id,
            ExtractedMesh {
                entity_id,
                vertex_data: interleave(object),
                transform: model_transform.to_cols_array(),
                visible: true,
                material: textures,
            },
        );
    }

    let environment = load_image_rgba(
        &asset_dir
            .parent()
            .unwrap_or(asset_dir)
            .join("environments/ocean.jpg"),
    )
    .ok();

    Ok(ExtractedScene {
        meshes,
        environment,
    })
}

/// Free-look camera: yaw/pitch plus WASD translation.
struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    move_speed: f32,
}

impl Camera {
    fn new() -> Self {
        Self {
            // Start looking at the living room at (0, 0, -7).
            position: Vec3::new(-2.0, 1.75, -2.0),
            yaw: 22f32.to_radians(),
            pitch: -15f32.to_radians(),
            move_speed: 0.05,
        }
    }

    fn forward(&self) -> Vec3 {
        Vec3::new(
            self.yaw.sin() * self.pitch.cos(),
            self.pitch.sin(),
            -self.yaw.cos() * self.pitch.cos(),
        )
    }

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(50.5f32.to_radians(), aspect, 0.01, 1000.0)
    }
}

#[derive(Default)]
struct Keys {
    forward: bool,
    back: bool,
    left: bool,
    right: bool,
    up: bool,
    down: bool,
    look_left: bool,
    look_right: bool,
    look_up: bool,
    look_down: bool,
}

struct App {
    window: Option<winit::window::Window>,
    backend: Option<Box<dyn RenderBackendWindow>>,
    scene: ExtractedScene,
    scene_uploaded: bool,
    sun: DirectionalLight,
    spot: SpotLight,
    settings: RenderSettings,
    precompute_requested: bool,
    camera: Camera,
    keys: Keys,
    size: (u32, u32),
    last_frame: Instant,
}

impl App {
    fn new(asset_dir: &Path) -> Result<Self, String> {
        let model = Mat4::from_scale_rotation_translation(
            Vec3::splat(1.8),
            glam::Quat::IDENTITY,
            Vec3::new(0.0, 0.0, -7.0),
        );
        let scene = load_scene(asset_dir, model)?;
        Ok(Self {
            window: None,
            backend: None,
            scene,
            scene_uploaded: false,
            sun: DirectionalLight::new(Vec3::new(0.35, -0.7, -1.0), Vec3::splat(0.2)),
            spot: SpotLight::new(
                Vec3::new(-3.2, 2.2, 0.5),
                Vec3::new(-1.0, 0.0, 0.3),
                20.0,
                Vec3::new(1.0, 0.6, 20.0),
            ),
            settings: RenderSettings::default(),
            precompute_requested: false,
            camera: Camera::new(),
            keys: Keys::default(),
            size: (1280, 720),
            last_frame: Instant::now(),
        })
    }

    fn handle_key(&mut self, code: KeyCode, pressed: bool) {
        match code {
            KeyCode::KeyW => self.keys.forward = pressed,
            KeyCode::KeyS => self.keys.back = pressed,
            KeyCode::KeyA => self.keys.left = pressed,
            KeyCode::KeyD => self.keys.right = pressed,
            KeyCode::KeyE => self.keys.up = pressed,
            KeyCode::KeyQ => self.keys.down = pressed,
            KeyCode::ArrowLeft => self.keys.look_left = pressed,
            KeyCode::ArrowRight => self.keys.look_right = pressed,
            KeyCode::ArrowUp => self.keys.look_up = pressed,
            KeyCode::ArrowDown => self.keys.look_down = pressed,
            _ => {}
        }
        if !pressed {
            return;
        }
        match code {
            KeyCode::KeyP => {
                self.precompute_requested = true;
                log::info!("precompute sweep requested");
            }
            KeyCode::KeyL => {
                self.settings.render_probe_locations = !self.settings.render_probe_locations;
            }
            KeyCode::Tab => {
                self.settings.show_probe = !self.settings.show_probe;
            }
            KeyCode::BracketLeft => {
                self.settings.probe_index = self.settings.probe_index.saturating_sub(1);
            }
            KeyCode::BracketRight => {
                self.settings.probe_index += 1;
            }
            KeyCode::KeyM => {
                let all = ProbeChannel::ALL;
                let current = all
                    .iter()
                    .position(|&c| c == self.settings.probe_channel)
                    .unwrap_or(0);
                self.settings.probe_channel = all[(current + 1) % all.len()];
                log::info!("probe viewer channel: {}", self.settings.probe_channel.label());
            }
            _ => {}
        }
    }

    fn update_camera(&mut self) {
        let rotate = 0.02;
        if self.keys.look_left {
            self.camera.yaw -= rotate;
        }
        if self.keys.look_right {
            self.camera.yaw += rotate;
        }
        if self.keys.look_up {
            self.camera.pitch = (self.camera.pitch + rotate).min(1.5);
        }
        if self.keys.look_down {
            self.camera.pitch = (self.camera.pitch - rotate).max(-1.5);
        }

        let forward = self.camera.forward();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let mut translation = Vec3::ZERO;
        if self.keys.forward {
            translation += forward;
        }
        if self.keys.back {
            translation -= forward;
        }
        if self.keys.right {
            translation += right;
        }
        if self.keys.left {
            translation -= right;
        }
        if self.keys.up {
            translation += Vec3::Y;
        }
        if self.keys.down {
            translation -= Vec3::Y;
        }
        if translation != Vec3::ZERO {
            self.camera.position += translation.normalize() * self.camera.move_speed;
        }
    }

    fn build_frame(&mut self) -> FrameInput {
        let (width, height) = self.size;
        let aspect = if height > 0 {
            width as f32 / height as f32
        } else {
            1.0
        };
        let view = ExtractedView {
            view: self.camera.view_matrix().to_cols_array(),
            projection: self.camera.projection_matrix(aspect).to_cols_array(),
            camera_position: self.camera.position.to_array(),
            viewport_size: self.size,
        };
        let frame = FrameInput {
            view,
            sun: self.sun.frame_state(),
            spot: self.spot.frame_state(),
            settings: self.settings.clone(),
            precompute_requested: self.precompute_requested,
        };
        self.precompute_requested = false;
        frame
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = winit::window::WindowAttributes::default()
            .with_title("Lucerna light-field probes")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = event_loop.create_window(attrs).expect("create window");
        let phys = window.inner_size();
        self.size = (phys.width.max(1), phys.height.max(1));
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(physical) => {
                self.size = (physical.width.max(1), physical.height.max(1));
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.handle_key(code, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::RedrawRequested => {
                if self.window.is_none() {
                    return;
                }
                if self.backend.is_none() {
                    let window = self.window.as_ref().expect("checked above");
                    match lucerna_bridge::LucernaWindowBackend::from_window(window) {
                        Ok(backend) => self.backend = Some(backend),
                        Err(e) => {
                            eprintln!("renderer unavailable: {e}");
                            event_loop.exit();
                            return;
                        }
                    }
                }

                self.update_camera();
                let frame = self.build_frame();

                let window = self.window.as_ref().expect("checked above");
                let (raw_window, raw_display) =
                    match (window.window_handle(), window.display_handle()) {
                        (Ok(wh), Ok(dh)) => (wh.as_raw(), dh.as_raw()),
                        _ => return,
                    };
                if let Some(backend) = &mut self.backend {
                    if !self.scene_uploaded {
                        backend.prepare(&self.scene);
                        self.scene_uploaded = true;
                    }
                    window.pre_present_notify();
                    if let Err(e) = backend.render_frame_to_window(&frame, raw_window, raw_display) {
                        log::error!("frame failed: {e}");
                    }
                }

                // Pace to the target frame rate.
                let target = self.settings.target_fps.max(1);
                let frame_budget = Duration::from_secs_f32(1.0 / target as f32);
                let elapsed = self.last_frame.elapsed();
                if elapsed < frame_budget {
                    std::thread::sleep(frame_budget - elapsed);
                }
                self.last_frame = Instant::now();
                window.request_redraw();
            }
            _ => {}
        }
    }
}

fn main() -> Result<(), String> {
    env_logger::init();
    let asset_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets/living_room"));
    if !asset_dir.exists() {
        return Err(format!("asset directory not found: {}", asset_dir.display()));
    }
    let event_loop = winit::event_loop::EventLoop::new().map_err(|e| e.to_string())?;
    let mut app = App::new(&asset_dir)?;
    event_loop.run_app(&mut app).map_err(|e| e.to_string())?;
    Ok(())
}
