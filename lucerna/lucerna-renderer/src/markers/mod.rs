//! Probe-location markers: small unlit spheres drawn instanced at every
//! probe position.

use wgpu::util::DeviceExt;
use wgpu::CommandEncoder;

use crate::error::RenderError;
use crate::grid::ProbeGrid;

const MARKER_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/marker.wgsl"));

pub const MARKER_RADIUS: f32 = 0.08;
const MARKER_COLOR: [f32; 3] = [0.0, 1.0, 0.0];
const SPHERE_RINGS: u32 = 8;
const SPHERE_SECTORS: u32 = 8;

/// UV-sphere positions and triangle indices (rings x sectors).
fn sphere_mesh(radius: f32, rings: u32, sectors: u32) -> (Vec<f32>, Vec<u16>) {
    let r_step = 1.0 / (rings - 1) as f32;
    let s_step = 1.0 / (sectors - 1) as f32;
    let pi = std::f32::consts::PI;

    let mut positions = Vec::with_capacity((rings * sectors * 3) as usize);
    for r in 0..rings {
        for s in 0..sectors {
            let polar = pi * r as f32 * r_step;
            let azimuth = 2.0 * pi * s as f32 * s_step;
            let y = (-pi / 2.0 + polar).sin();
            let x = azimuth.cos() * polar.sin();
            let z = azimuth.sin() * polar.sin();
            positions.push(x * radius);
            positions.push(y * radius);
            positions.push(z * radius);
        }
    }

    let mut indices = Vec::with_capacity(((rings - 1) * (sectors - 1) * 6) as usize);
    for r in 0..rings - 1 {
        for s in 0..sectors - 1 {
            let i0 = (r * sectors + s) as u16;
            let i1 = (r * sectors + s + 1) as u16;
            let i2 = ((r + 1) * sectors + s + 1) as u16;
            let i3 = ((r + 1) * sectors + s) as u16;
            indices.extend_from_slice(&[i2, i1, i0, i3, i2, i0]);
        }
    }
    (positions, indices)
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MarkerUniforms {
    view_projection: [f32; 16],
    color: [f32; 3],
    _pad: f32,
}

pub struct MarkerPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buf: wgpu::Buffer,
    vertex_buf: wgpu::Buffer,
    index_buf: wgpu::Buffer,
    index_count: u32,
    instance_buf: wgpu::Buffer,
    instance_count: u32,
}

impl MarkerPass {
    pub fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        grid: &ProbeGrid,
    ) -> Result<Self, RenderError> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("marker_shader"),
            source: wgpu::ShaderSource::Wgsl(MARKER_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("marker_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: std::num::NonZeroU64::new(
                        std::mem::size_of::<MarkerUniforms>() as u64,
                    ),
                },
                count: None,
            }],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("marker_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("marker_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: 12,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 0,
                            format: wgpu::VertexFormat::Float32x3,
                        }],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: 12,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[wgpu::VertexAttribute {
                            offset: 0,
                            shader_location: 1,
                            format: wgpu::VertexFormat::Float32x3,
                        }],
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(output_format.into())],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: crate::resources::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let (positions, indices) = sphere_mesh(MARKER_RADIUS, SPHERE_RINGS, SPHERE_SECTORS);
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marker_sphere_vertices"),
            contents: bytemuck::cast_slice(&positions),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marker_sphere_indices"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let mut translations = Vec::with_capacity(grid.count() * 3);
        for probe in grid.probes() {
            translations.extend_from_slice(&probe.position.to_array());
        }
        let instance_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("marker_instances"),
            contents: bytemuck::cast_slice(&translations),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("marker_uniforms"),
            size: std::mem::size_of::<MarkerUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            uniform_buf,
            vertex_buf,
            index_buf,
            index_count: indices.len() as u32,
            instance_buf,
            instance_count: grid.count() as u32,
        })
    }

    pub fn encode(
        &self,
        encoder: &mut CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        view_projection: &[f32; 16],
    ) -> Result<(), RenderError> {
        let uniforms = MarkerUniforms {
            view_projection: *view_projection,
            color: MARKER_COLOR,
            _pad: 0.0,
        };
        queue.write_buffer(&self.uniform_buf, 0, bytemuck::bytes_of(&uniforms));
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("marker_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: self.uniform_buf.as_entire_binding(),
            }],
        });

        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("marker_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rp.set_pipeline(&self.pipeline);
        rp.set_bind_group(0, &bind_group, &[]);
        rp.set_vertex_buffer(0, self.vertex_buf.slice(..));
        rp.set_vertex_buffer(1, self.instance_buf.slice(..));
        rp.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint16);
        rp.draw_indexed(0..self.index_count, 0, 0..self.instance_count);
        drop(rp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_mesh_counts() {
        let (positions, indices) = sphere_mesh(1.0, 8, 8);
        assert_eq!(positions.len(), 8 * 8 * 3);
        assert_eq!(indices.len(), 7 * 7 * 6);
        assert!(indices.iter().all(|&i| (i as usize) < 64));
    }

    #[test]
    fn sphere_vertices_lie_on_the_sphere() {
        let radius = 0.08;
        let (positions, _) = sphere_mesh(radius, 8, 8);
        for p in positions.chunks_exact(3) {
            let len = (p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt();
            assert!((len - radius).abs() < 1e-5);
        }
    }
}
