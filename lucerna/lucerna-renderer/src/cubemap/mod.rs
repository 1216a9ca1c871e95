//! Cubemap capture pass: render the scene from a probe location into one
//! face of the scratch cubemap set (radiance, normals, distance moments,
//! depth). Lit by directional + spot + shadow + environment, but never by
//! the probe grid itself.

use glam::{Mat4, Vec3};
use wgpu::CommandEncoder;

use crate::error::RenderError;
use crate::resources::{
    validate_attachments, AttachmentSpec, CubemapSet, CUBE_DEPTH_FORMAT, CUBE_DISTANCE_FORMAT,
    CUBE_NORMALS_FORMAT, CUBE_RADIANCE_FORMAT,
};
use crate::scene::{
    mesh_vertex_layout, per_mesh_bind_group_layout, write_mesh_bind_group, MeshDraw, SceneUniforms,
};

const CAPTURE_SHADER: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/probe_capture.wgsl"));

pub const CUBE_FACE_COUNT: u32 = 6;
pub const CUBE_NEAR: f32 = 0.1;
pub const CUBE_FAR: f32 = 100.0;

/// Fixed look directions in cube-face order (+X -X +Y -Y +Z -Z).
pub const CUBE_LOOK_DIR: [Vec3; 6] = [
    Vec3::X,
    Vec3::NEG_X,
    Vec3::Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
];

/// Up vectors chosen to avoid gimbal degeneracy at the ±Y poles.
pub const CUBE_LOOK_UP: [Vec3; 6] = [
    Vec3::NEG_Y,
    Vec3::NEG_Y,
    Vec3::Z,
    Vec3::NEG_Z,
    Vec3::NEG_Y,
    Vec3::NEG_Y,
];

/// View matrix for one face of a probe cubemap.
pub fn face_view_matrix(position: Vec3, face: u32) -> Mat4 {
    let i = face as usize;
    Mat4::look_at_rh(position, position + CUBE_LOOK_DIR[i], CUBE_LOOK_UP[i])
}

/// 90° FOV square projection shared by all faces.
pub fn face_projection_matrix() -> Mat4 {
    Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, CUBE_NEAR, CUBE_FAR)
}

pub struct CubemapPass {
    pipeline: wgpu::RenderPipeline,
    frame_layout: wgpu::BindGroupLayout,
    mesh_layout: wgpu::BindGroupLayout,
    shared_layout: wgpu::BindGroupLayout,
    material_sampler: wgpu::Sampler,
    shadow_sampler: wgpu::Sampler,
    env_sampler: wgpu::Sampler,
}

impl CubemapPass {
    pub fn new(device: &wgpu::Device) -> Result<Self, RenderError> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("probe_capture_shader"),
            source: wgpu::ShaderSource::Wgsl(CAPTURE_SHADER.into()),
        });

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("capture_frame_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<SceneUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });

        let mesh_layout = per_mesh_bind_group_layout(device, "capture_mesh_layout");

        let shared_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("capture_shared_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("capture_pipeline_layout"),
            bind_group_layouts: &[&frame_layout, &mesh_layout, &shared_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("capture_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[mesh_vertex_layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[
                    Some(CUBE_RADIANCE_FORMAT.into()),
                    Some(CUBE_NORMALS_FORMAT.into()),
                    Some(CUBE_DISTANCE_FORMAT.into()),
                ],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: CUBE_DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("capture_material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("capture_shadow_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let env_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("capture_env_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            pipeline,
            frame_layout,
            mesh_layout,
            shared_layout,
            material_sampler,
            shadow_sampler,
            env_sampler,
        })
    }

    /// Check the four face attachments after rebinding to a new face. A
    /// failure here is fatal for the current probe.
    pub fn validate_face_targets(&self, cubemaps: &CubemapSet) -> Result<(), RenderError> {
        let size = cubemaps.size();
        validate_attachments(
            "cubemap_face",
            &[
                AttachmentSpec {
                    texture: &cubemaps.radiance,
                    width: size,
                    height: size,
                    format: CUBE_RADIANCE_FORMAT,
                },
                AttachmentSpec {
                    texture: &cubemaps.normals,
                    width: size,
                    height: size,
                    format: CUBE_NORMALS_FORMAT,
                },
                AttachmentSpec {
                    texture: &cubemaps.distance,
                    width: size,
                    height: size,
                    format: CUBE_DISTANCE_FORMAT,
                },
                AttachmentSpec {
                    texture: &cubemaps.depth,
                    width: size,
                    height: size,
                    format: CUBE_DEPTH_FORMAT,
                },
            ],
        )
    }

    /// Draw every mesh into one cube face. The uniform buffer is created per
    /// face: all six faces are encoded before a single submit, so they must
    /// not share one.
    #[allow(clippy::too_many_arguments)]
    pub fn encode_face(
        &self,
        encoder: &mut CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        cubemaps: &CubemapSet,
        face: u32,
        uniforms: &SceneUniforms,
        meshes: &[MeshDraw],
        shadow_view: &wgpu::TextureView,
        environment_view: &wgpu::TextureView,
    ) -> Result<(), RenderError> {
        let frame_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("capture_frame_uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&frame_buf, 0, bytemuck::bytes_of(uniforms));
        let frame_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("capture_frame_bind_group"),
            layout: &self.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buf.as_entire_binding(),
            }],
        });
        let shared_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("capture_shared_bind_group"),
            layout: &self.shared_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.shadow_sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(environment_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.env_sampler),
                },
            ],
        });

        let radiance_view = cubemaps.radiance_face_view(face);
        let normals_view = cubemaps.normals_face_view(face);
        let distance_view = cubemaps.distance_face_view(face);
        let depth_view = cubemaps.depth_face_view(face);

        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("cubemap_face_pass"),
            color_attachments: &[
                Some(wgpu::RenderPassColorAttachment {
                    view: &radiance_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &normals_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                }),
                Some(wgpu::RenderPassColorAttachment {
                    view: &distance_view,
                    resolve_target: None,
                    // Clear to the far distance so unoccluded directions
                    // read as "no geometry".
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: CUBE_FAR as f64,
                            g: (CUBE_FAR * CUBE_FAR) as f64,
                            b: 0.0,
                            a: 0.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                }),
            ],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, &frame_bg, &[]);
        rp.set_bind_group(2, &shared_bg, &[]);
        for mesh in meshes {
            let mesh_bg = write_mesh_bind_group(
                device,
                queue,
                &self.mesh_layout,
                &self.material_sampler,
                mesh,
                "capture_mesh_bind_group",
            );
            rp.set_bind_group(1, &mesh_bg, &[]);
            rp.set_vertex_buffer(0, mesh.vertex_buf.slice(..));
            rp.draw(0..mesh.vertex_count, 0..1);
        }
        drop(rp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_views_look_along_cube_axes() {
        let position = Vec3::new(1.0, 2.0, 3.0);
        for face in 0..CUBE_FACE_COUNT {
            let view = face_view_matrix(position, face);
            // The view matrix maps the look direction to -Z.
            let forward = view.transform_vector3(CUBE_LOOK_DIR[face as usize]);
            assert!((forward - Vec3::NEG_Z).length() < 1e-5, "face {face}");
            // Probe position maps to the view-space origin.
            let center = view.transform_point3(position);
            assert!(center.length() < 1e-5);
        }
    }

    #[test]
    fn up_vectors_are_not_collinear_with_look_directions() {
        for face in 0..6 {
            let d = CUBE_LOOK_DIR[face];
            let u = CUBE_LOOK_UP[face];
            assert!(d.cross(u).length() > 0.5, "face {face}");
        }
    }
}
