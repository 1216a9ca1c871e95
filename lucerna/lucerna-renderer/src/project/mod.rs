//! Octahedral projection pass: reproject the scratch cubemaps into one layer
//! of the octahedral atlas arrays, at full resolution (distance/radiance/
//! normals) and at the downsampled distance resolution.

use wgpu::CommandEncoder;

use render_api::ProbeChannel;

use crate::error::RenderError;
use crate::resources::{
    validate_attachments, AttachmentSpec, CubemapSet, ProbeAtlases, ATLAS_DISTANCE_FORMAT,
    ATLAS_NORMALS_FORMAT, ATLAS_RADIANCE_FORMAT,
};

const PROJECT_SHADER: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/shaders/octahedral_project.wgsl"));

pub struct OctahedralProjectPass {
    high_pipeline: wgpu::RenderPipeline,
    low_pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
}

impl OctahedralProjectPass {
    pub fn new(device: &wgpu::Device) -> Result<Self, RenderError> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("octahedral_project_shader"),
            source: wgpu::ShaderSource::Wgsl(PROJECT_SHADER.into()),
        });

        let cube_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::Cube,
                multisampled: false,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("octahedral_bind_group_layout"),
            entries: &[
                cube_entry(0),
                cube_entry(1),
                cube_entry(2),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("octahedral_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // High resolution: distance (target 0), radiance (1), normals (2).
        let high_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("octahedral_high_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_high"),
                targets: &[
                    Some(ATLAS_DISTANCE_FORMAT.into()),
                    Some(ATLAS_RADIANCE_FORMAT.into()),
                    Some(ATLAS_NORMALS_FORMAT.into()),
                ],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let low_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("octahedral_low_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_low"),
                targets: &[Some(ATLAS_DISTANCE_FORMAT.into())],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("octahedral_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            high_pipeline,
            low_pipeline,
            bind_group_layout,
            sampler,
        })
    }

    /// Project one probe's cubemaps into atlas layer `layer`: a single
    /// fullscreen pass per output resolution, no incremental accumulation.
    /// Both destination target sets are validated before drawing.
    pub fn encode(
        &self,
        encoder: &mut CommandEncoder,
        device: &wgpu::Device,
        cubemaps: &CubemapSet,
        atlases: &ProbeAtlases,
        layer: u32,
    ) -> Result<(), RenderError> {
        let octa = atlases.size(ProbeChannel::DistanceHigh);
        validate_attachments(
            "octahedral_high",
            &[
                AttachmentSpec {
                    texture: &atlases.distance_high,
                    width: octa,
                    height: octa,
                    format: ATLAS_DISTANCE_FORMAT,
                },
                AttachmentSpec {
                    texture: &atlases.radiance,
                    width: octa,
                    height: octa,
                    format: ATLAS_RADIANCE_FORMAT,
                },
                AttachmentSpec {
                    texture: &atlases.normals,
                    width: octa,
                    height: octa,
                    format: ATLAS_NORMALS_FORMAT,
                },
            ],
        )?;
        let low = atlases.size(ProbeChannel::DistanceLow);
        validate_attachments(
            "octahedral_low",
            &[AttachmentSpec {
                texture: &atlases.distance_low,
                width: low,
                height: low,
                format: ATLAS_DISTANCE_FORMAT,
            }],
        )?;

        let radiance_cube = cubemaps.radiance_cube_view();
        let normals_cube = cubemaps.normals_cube_view();
        let distance_cube = cubemaps.distance_cube_view();
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("octahedral_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&radiance_cube),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&normals_cube),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&distance_cube),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let distance_view = atlases.layer_view(ProbeChannel::DistanceHigh, layer);
        let radiance_view = atlases.layer_view(ProbeChannel::Radiance, layer);
        let normals_view = atlases.layer_view(ProbeChannel::Normals, layer);
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("octahedral_high_pass"),
                color_attachments: &[
                    Some(wgpu::RenderPassColorAttachment {
                        view: &distance_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    }),
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
                ],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&self.high_pipeline);
            rp.set_bind_group(0, &bind_group, &[]);
            rp.draw(0..3, 0..1);
        }

        let low_view = atlases.layer_view(ProbeChannel::DistanceLow, layer);
        {
            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("octahedral_low_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &low_view,
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
            rp.set_pipeline(&self.low_pipeline);
            rp.set_bind_group(0, &bind_group, &[]);
            rp.draw(0..3, 0..1);
        }
        Ok(())
    }
}
