//! Lucerna renderer: light-field probe GI on wgpu.
//!
//! The probe pipeline runs one probe per invocation: cubemap capture of the
//! scene (radiance/normals/distance/depth), a queue flush, octahedral
//! reprojection into the atlas arrays, then Monte-Carlo irradiance and
//! Chebyshev-distance filtering. The scene pass consumes the atlas arrays
//! as read-only inputs every frame.

pub mod blit;
pub mod config;
pub mod cubemap;
pub mod environment;
pub mod error;
pub mod filter;
pub mod grid;
pub mod mapping;
pub mod markers;
pub mod precompute;
pub mod project;
pub mod resources;
pub mod samples;
pub mod scene;
pub mod shadow;

use glam::{Mat4, Vec3};

use render_api::{FrameInput, ProbeChannel, RenderSettings, SpotLightState, SunState, TextureData};

pub use config::LucernaConfig;
pub use error::RenderError;
pub use grid::{Probe, ProbeGrid};
pub use precompute::{PrecomputeState, ProbePrecompute};
pub use scene::{GridUniforms, MaterialViews, MeshDraw, SceneUniforms, MESH_VERTEX_STRIDE};

use blit::ArrayBlitPass;
use cubemap::{face_projection_matrix, face_view_matrix, CubemapPass, CUBE_FACE_COUNT};
use environment::{EnvironmentPass, EnvironmentUniforms};
use filter::{FilterPass, FilterTarget};
use markers::MarkerPass;
use project::OctahedralProjectPass;
use resources::{CubemapSet, FrameResources, ProbeAtlases, ShadowMap};
use samples::SPHERE_SAMPLE_COUNT;
use scene::ScenePass;
use shadow::ShadowPass;

/// Upload RGBA8 pixel data as a sampled 2D texture.
pub fn upload_rgba_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    data: &TextureData,
    label: &str,
) -> wgpu::Texture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8Unorm,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::ImageCopyTexture {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &data.data,
        wgpu::ImageDataLayout {
            offset: 0,
            bytes_per_row: Some(4 * data.width),
            rows_per_image: Some(data.height),
        },
        wgpu::Extent3d {
            width: data.width,
            height: data.height,
            depth_or_array_layers: 1,
        },
    );
    texture
}

/// Owns the device, the probe grid and its atlas textures, and every pass.
/// Constructed once at startup; all stages receive it explicitly.
pub struct Renderer {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: LucernaConfig,
    grid: ProbeGrid,
    cubemaps: CubemapSet,
    atlases: ProbeAtlases,
    shadow_map: ShadowMap,
    frame_resources: Option<FrameResources>,
    shadow_pass: ShadowPass,
    cubemap_pass: CubemapPass,
    project_pass: OctahedralProjectPass,
    filter_pass: FilterPass,
    scene_pass: ScenePass,
    environment_pass: EnvironmentPass,
    marker_pass: MarkerPass,
    blit_pass: ArrayBlitPass,
    precompute: ProbePrecompute,
    environment_view: wgpu::TextureView,
}

impl Renderer {
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        config: LucernaConfig,
    ) -> Result<Self, RenderError> {
        let limits = device.limits();
        let samples_bytes = (SPHERE_SAMPLE_COUNT * 16) as u32;
        if limits.max_uniform_buffer_binding_size < samples_bytes {
            return Err(RenderError::UnsupportedPlatform(format!(
                "uniform binding limit {} below sample table size {}",
                limits.max_uniform_buffer_binding_size, samples_bytes
            )));
        }

        let grid = ProbeGrid::place(
            Vec3::from_array(config.probe_origin),
            Vec3::from_array(config.probe_step),
            config.probe_counts,
        )?;
        let probe_count = grid.count() as u32;
        if limits.max_texture_array_layers < probe_count {
            return Err(RenderError::UnsupportedPlatform(format!(
                "texture array layer limit {} below probe count {}",
                limits.max_texture_array_layers, probe_count
            )));
        }

        let cubemaps = CubemapSet::new(&device, config.cubemap_size);
        let atlases = ProbeAtlases::new(&device, &config, probe_count);
        let shadow_map = ShadowMap::new(&device, config.shadow_map_size);

        let shadow_pass = ShadowPass::new(&device)?;
        let cubemap_pass = CubemapPass::new(&device)?;
        let project_pass = OctahedralProjectPass::new(&device)?;
        let filter_pass = FilterPass::new(&device, &queue)?;
        let scene_pass = ScenePass::new(&device, config.swapchain_format)?;
        let environment_pass = EnvironmentPass::new(&device, config.swapchain_format)?;
        let marker_pass = MarkerPass::new(&device, config.swapchain_format, &grid)?;
        let blit_pass = ArrayBlitPass::new(&device, config.swapchain_format)?;

        let precompute = ProbePrecompute::new(grid.count());

        // Placeholder environment until the host provides one.
        let default_env = TextureData {
            data: vec![200, 200, 200, 255],
            width: 1,
            height: 1,
        };
        let environment_texture = upload_rgba_texture(&device, &queue, &default_env, "environment_map");
        let environment_view = environment_texture.create_view(&Default::default());

        Ok(Self {
            device,
            queue,
            config,
            grid,
            cubemaps,
            atlases,
            shadow_map,
            frame_resources: None,
            shadow_pass,
            cubemap_pass,
            project_pass,
            filter_pass,
            scene_pass,
            environment_pass,
            marker_pass,
            blit_pass,
            precompute,
            environment_view,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn config(&self) -> &LucernaConfig {
        &self.config
    }

    pub fn grid(&self) -> &ProbeGrid {
        &self.grid
    }

    pub fn precompute(&self) -> &ProbePrecompute {
        &self.precompute
    }

    /// Replace the equirectangular environment map.
    pub fn set_environment(&mut self, data: &TextureData) {
        let texture = upload_rgba_texture(&self.device, &self.queue, data, "environment_map");
        self.environment_view = texture.create_view(&Default::default());
    }

    pub fn ensure_frame_resources(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let existing = self.frame_resources.take();
        self.frame_resources = Some(FrameResources::ensure_size(
            &self.device,
            existing,
            width,
            height,
        )?);
        Ok(())
    }

    /// Start a sweep: one probe is precomputed per subsequent tick until the
    /// cursor wraps.
    pub fn trigger_precompute(&mut self) {
        self.precompute.trigger();
    }

    /// Render the shadow map if the light direction or mesh count changed.
    pub fn update_shadow(&mut self, meshes: &[MeshDraw], sun: &SunState) {
        if !self.shadow_pass.needs_render(sun.direction, meshes.len()) {
            return;
        }
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lucerna_shadow"),
        });
        let shadow_view = self.shadow_map.view();
        if let Err(e) = self.shadow_pass.encode(
            &mut encoder,
            &self.device,
            &self.queue,
            &shadow_view,
            meshes,
            &sun.view_projection,
        ) {
            log::error!("shadow pass failed: {e}");
            return;
        }
        self.queue.submit([encoder.finish()]);
    }

    /// Run at most one probe through the precompute pipeline. Returns the
    /// probe index that was processed, if any. Failures are logged and the
    /// cursor still advances; the stale atlas layer persists until the next
    /// successful pass over that index.
    pub fn precompute_step(
        &mut self,
        meshes: &[MeshDraw],
        sun: &SunState,
        spot: &SpotLightState,
        settings: &RenderSettings,
    ) -> Option<usize> {
        if !self.precompute.wants_step() {
            return None;
        }
        let index = self.precompute.begin_step();
        let result = self.run_probe(index, meshes, sun, spot, settings);
        match &result {
            Ok(()) => log::info!("precomputed probe {index}"),
            Err(e) => log::error!("precompute for probe {index} aborted: {e}"),
        }
        self.precompute.finish_step(result.is_ok());
        Some(index)
    }

    /// The full pipeline for one probe, synchronous to completion:
    /// 6 cubemap faces, a queue flush, octahedral projection, and the two
    /// filter convolutions.
    fn run_probe(
        &mut self,
        index: usize,
        meshes: &[MeshDraw],
        sun: &SunState,
        spot: &SpotLightState,
        settings: &RenderSettings,
    ) -> Result<(), RenderError> {
        let position = self.grid.position(index);
        let projection = face_projection_matrix();
        let shadow_view = self.shadow_map.view();

        self.cubemap_pass.validate_face_targets(&self.cubemaps)?;

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lucerna_probe_capture"),
        });
        for face in 0..CUBE_FACE_COUNT {
            let view = face_view_matrix(position, face);
            let uniforms = build_scene_uniforms(
                view,
                projection,
                position,
                self.config.ambient_color,
                settings.environment_brightness,
                sun,
                spot,
            );
            self.cubemap_pass.encode_face(
                &mut encoder,
                &self.device,
                &self.queue,
                &self.cubemaps,
                face,
                &uniforms,
                meshes,
                &shadow_view,
                &self.environment_view,
            )?;

            let env_uniforms = EnvironmentUniforms {
                world_from_projection: (projection * view).inverse().to_cols_array(),
                camera_position: position.to_array(),
                brightness: settings.environment_brightness,
            };
            let radiance_view = self.cubemaps.radiance_face_view(face);
            let normals_view = self.cubemaps.normals_face_view(face);
            let distance_view = self.cubemaps.distance_face_view(face);
            let depth_view = self.cubemaps.depth_face_view(face);
            self.environment_pass.encode_capture(
                &mut encoder,
                &self.device,
                &self.queue,
                &radiance_view,
                &normals_view,
                &distance_view,
                &depth_view,
                &env_uniforms,
                &self.environment_view,
            )?;
        }
        // Flush: the projection pass may otherwise observe a
        // partially-rendered cubemap on some drivers.
        self.queue.submit([encoder.finish()]);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("lucerna_probe_filter"),
        });
        self.project_pass.encode(
            &mut encoder,
            &self.device,
            &self.cubemaps,
            &self.atlases,
            index as u32,
        )?;

        let radiance_cube = self.cubemaps.radiance_cube_view();
        let irradiance_view = self.atlases.layer_view(ProbeChannel::Irradiance, index as u32);
        self.filter_pass.encode(
            &mut encoder,
            &self.device,
            &self.queue,
            FilterTarget::Irradiance,
            &self.atlases.irradiance,
            &irradiance_view,
            self.atlases.size(ProbeChannel::Irradiance),
            &radiance_cube,
            settings.irradiance_num_samples,
            settings.irradiance_lobe_size,
        )?;

        let distance_cube = self.cubemaps.distance_cube_view();
        let filtered_view = self
            .atlases
            .layer_view(ProbeChannel::FilteredDistance, index as u32);
        self.filter_pass.encode(
            &mut encoder,
            &self.device,
            &self.queue,
            FilterTarget::FilteredDistance,
            &self.atlases.filtered_distance,
            &filtered_view,
            self.atlases.size(ProbeChannel::FilteredDistance),
            &distance_cube,
            settings.irradiance_num_samples,
            settings.filtered_distance_lobe_size,
        )?;
        self.queue.submit([encoder.finish()]);
        Ok(())
    }

    /// Scene + probe markers + environment background into `target_view`.
    pub fn encode_scene_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        target_view: &wgpu::TextureView,
        frame: &FrameInput,
        meshes: &[MeshDraw],
    ) -> Result<(), RenderError> {
        let (width, height) = frame.view.viewport_size;
        self.ensure_frame_resources(width, height)?;
        let frame_res = self.frame_resources.as_ref().expect("just ensured");
        let depth_view = frame_res.depth_view();

        if self.precompute.invalid_count() > 0 {
            log::debug!(
                "sampling probe grid with {} incomplete layer(s)",
                self.precompute.invalid_count()
            );
        }

        let view = Mat4::from_cols_array(&frame.view.view);
        let projection = Mat4::from_cols_array(&frame.view.projection);
        let uniforms = build_scene_uniforms(
            view,
            projection,
            Vec3::from_array(frame.view.camera_position),
            self.config.ambient_color,
            frame.settings.environment_brightness,
            &frame.sun,
            &frame.spot,
        );
        // Must describe the same lattice the planner produced, or the
        // fragment stage silently addresses the wrong probes.
        let counts = self.grid.counts();
        let grid_uniforms = GridUniforms {
            probe_origin: self.grid.origin().to_array(),
            _pad0: 0.0,
            probe_step: self.grid.step().to_array(),
            low_downsample: self.config.low_downsample as f32,
            probe_counts: [counts[0] as i32, counts[1] as i32, counts[2] as i32],
            probe_count_total: self.grid.count() as i32,
        };

        let shadow_view = self.shadow_map.view();
        self.scene_pass.encode(
            encoder,
            &self.device,
            &self.queue,
            target_view,
            &depth_view,
            meshes,
            &uniforms,
            &grid_uniforms,
            &shadow_view,
            &self.environment_view,
            &self.atlases,
        )?;

        let view_projection = projection * view;
        if frame.settings.render_probe_locations {
            self.marker_pass.encode(
                encoder,
                &self.device,
                &self.queue,
                target_view,
                &depth_view,
                &view_projection.to_cols_array(),
            )?;
        }

        let env_uniforms = EnvironmentUniforms {
            world_from_projection: view_projection.inverse().to_cols_array(),
            camera_position: frame.view.camera_position,
            brightness: frame.settings.environment_brightness,
        };
        self.environment_pass.encode(
            encoder,
            &self.device,
            &self.queue,
            target_view,
            &depth_view,
            &env_uniforms,
            &self.environment_view,
        )?;
        Ok(())
    }

    /// Debug viewer: blit one probe atlas layer instead of the scene.
    pub fn encode_probe_debug(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target_view: &wgpu::TextureView,
        settings: &RenderSettings,
    ) -> Result<(), RenderError> {
        let channel = settings.probe_channel;
        let layer = settings
            .probe_index
            .min(self.atlases.probe_count().saturating_sub(1));
        let array_view = self.atlases.array_view(channel);
        self.blit_pass.encode(
            encoder,
            &self.device,
            &self.queue,
            target_view,
            &array_view,
            layer,
            channel.is_distance(),
        )
    }
}

/// Pack the shared scene/capture uniforms, deriving the spot cone cosines.
fn build_scene_uniforms(
    view: Mat4,
    projection: Mat4,
    camera_position: Vec3,
    ambient_color: [f32; 4],
    environment_brightness: f32,
    sun: &SunState,
    spot: &SpotLightState,
) -> SceneUniforms {
    let half_cone = spot.cone_angle * 0.5;
    SceneUniforms {
        view: view.to_cols_array(),
        projection: projection.to_cols_array(),
        sun_view_projection: sun.view_projection,
        camera_position: camera_position.to_array(),
        environment_brightness,
        ambient_color,
        sun_direction: sun.direction,
        _pad0: 0.0,
        sun_color: sun.color,
        _pad1: 0.0,
        spot_position: spot.position,
        spot_cos_inner: (half_cone * 0.8).cos(),
        spot_direction: spot.direction,
        spot_cos_outer: half_cone.cos(),
        spot_color: spot.color,
        _pad2: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_uniforms_layout_matches_wgsl() {
        // 3 mat4 + 6 vec4 slots.
        assert_eq!(std::mem::size_of::<SceneUniforms>(), 3 * 64 + 6 * 16);
        assert_eq!(std::mem::size_of::<GridUniforms>(), 48);
    }

    #[test]
    fn spot_cone_cosines_are_ordered() {
        let sun = SunState {
            direction: [0.0, -1.0, 0.0],
            color: [1.0; 3],
            view_projection: Mat4::IDENTITY.to_cols_array(),
        };
        let spot = SpotLightState {
            position: [0.0; 3],
            direction: [0.0, -1.0, 0.0],
            color: [1.0; 3],
            cone_angle: 40f32.to_radians(),
        };
        let u = build_scene_uniforms(
            Mat4::IDENTITY,
            Mat4::IDENTITY,
            Vec3::ZERO,
            [0.25, 0.25, 0.25, 1.0],
            1.0,
            &sun,
            &spot,
        );
        // The inner cone is tighter, so its cosine is larger.
        assert!(u.spot_cos_inner > u.spot_cos_outer);
    }
}
