//! Irradiance/distance filter pass: Monte-Carlo hemispherical convolution of
//! one probe's cubemap data into a filtered atlas layer.
//!
//! Destination pixels map to directions through the sphere-map
//! parameterization (not the octahedral one) so the result stays continuous
//! under bilinear filtering. The same pipeline convolves radiance into
//! irradiance and the distance moments into the Chebyshev layer; only the
//! source texture, target format, and lobe size differ.

use wgpu::CommandEncoder;

use crate::error::RenderError;
use crate::resources::{
    validate_attachments, AttachmentSpec, ATLAS_FILTERED_DISTANCE_FORMAT, ATLAS_IRRADIANCE_FORMAT,
};
use crate::samples::{generate_sphere_samples, SPHERE_SAMPLE_COUNT};

const FILTER_SHADER: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/filter.wgsl"));

/// Seed for the shared sample table. Fixed so repeated precompute runs over
/// an unchanged scene produce identical atlas contents.
const SAMPLE_TABLE_SEED: u64 = 0x1f2e_3d4c;

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FilterParams {
    num_samples: u32,
    lobe_size: f32,
    _pad: [f32; 2],
}

/// Which of the two filter products a single encode call produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterTarget {
    Irradiance,
    FilteredDistance,
}

pub struct FilterPass {
    irradiance_pipeline: wgpu::RenderPipeline,
    distance_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    /// Uniform-sphere sample table, generated once and shared across all
    /// filter invocations.
    samples_buf: wgpu::Buffer,
    sampler: wgpu::Sampler,
}

impl FilterPass {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Self, RenderError> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("filter_shader"),
            source: wgpu::ShaderSource::Wgsl(FILTER_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("filter_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(
                            (SPHERE_SAMPLE_COUNT * 16) as u64,
                        ),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: std::num::NonZeroU64::new(16),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::Cube,
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
            label: Some("filter_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str, format: wgpu::TextureFormat| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs"),
                    targets: &[Some(format.into())],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let irradiance_pipeline = make_pipeline("filter_irradiance_pipeline", ATLAS_IRRADIANCE_FORMAT);
        let distance_pipeline =
            make_pipeline("filter_distance_pipeline", ATLAS_FILTERED_DISTANCE_FORMAT);

        let samples = generate_sphere_samples(SAMPLE_TABLE_SEED);
        let samples_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("filter_sphere_samples"),
            size: (SPHERE_SAMPLE_COUNT * 16) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&samples_buf, 0, bytemuck::cast_slice(&samples));

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("filter_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            irradiance_pipeline,
            distance_pipeline,
            bind_group_layout,
            samples_buf,
            sampler,
        })
    }

    /// Convolve `source_cube` into `target_view` (one atlas layer).
    /// `num_samples` trades time for variance with no correctness threshold.
    /// The params buffer is created per call: both filter products are
    /// encoded before one submit and must not share it.
    #[allow(clippy::too_many_arguments)]
    pub fn encode(
        &self,
        encoder: &mut CommandEncoder,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        target: FilterTarget,
        target_texture: &wgpu::Texture,
        target_view: &wgpu::TextureView,
        target_size: u32,
        source_cube: &wgpu::TextureView,
        num_samples: u32,
        lobe_size: f32,
    ) -> Result<(), RenderError> {
        let (pipeline, format) = match target {
            FilterTarget::Irradiance => (&self.irradiance_pipeline, ATLAS_IRRADIANCE_FORMAT),
            FilterTarget::FilteredDistance => {
                (&self.distance_pipeline, ATLAS_FILTERED_DISTANCE_FORMAT)
            }
        };
        validate_attachments(
            "filter",
            &[AttachmentSpec {
                texture: target_texture,
                width: target_size,
                height: target_size,
                format,
            }],
        )?;

        let params = FilterParams {
            num_samples: num_samples.min(SPHERE_SAMPLE_COUNT as u32).max(1),
            lobe_size,
            _pad: [0.0; 2],
        };
        let params_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("filter_params"),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        queue.write_buffer(&params_buf, 0, bytemuck::bytes_of(&params));

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("filter_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.samples_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(source_cube),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("filter_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        rp.set_pipeline(pipeline);
        rp.set_bind_group(0, &bind_group, &[]);
        rp.draw(0..3, 0..1);
        drop(rp);
        Ok(())
    }
}
