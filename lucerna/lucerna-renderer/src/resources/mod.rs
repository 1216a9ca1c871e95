//! GPU resource aggregates: the scratch cubemap set, the per-probe atlas
//! arrays, the shadow map, and swapchain-sized frame resources.

use render_api::ProbeChannel;

use crate::config::LucernaConfig;
use crate::error::RenderError;

pub const CUBE_RADIANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const CUBE_NORMALS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// r = distance, g = distance² (Chebyshev moments).
pub const CUBE_DISTANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;
pub const CUBE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub const ATLAS_RADIANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const ATLAS_NORMALS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const ATLAS_DISTANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R16Float;
pub const ATLAS_IRRADIANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const ATLAS_FILTERED_DISTANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;

pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

fn create_cube(device: &wgpu::Device, label: &str, size: u32, format: wgpu::TextureFormat) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

fn create_array(
    device: &wgpu::Device,
    label: &str,
    size: u32,
    layers: u32,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size,
            height: size,
            depth_or_array_layers: layers,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

fn face_view(texture: &wgpu::Texture, face: u32, label: &str) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some(label),
        dimension: Some(wgpu::TextureViewDimension::D2),
        base_array_layer: face,
        array_layer_count: Some(1),
        ..Default::default()
    })
}

/// Scratch storage for one probe's cubemap capture. A single set is reused
/// and overwritten every precompute invocation; any consumer needing prior
/// contents must copy out before the next invocation begins.
pub struct CubemapSet {
    pub radiance: wgpu::Texture,
    pub normals: wgpu::Texture,
    pub distance: wgpu::Texture,
    pub depth: wgpu::Texture,
    size: u32,
}

impl CubemapSet {
    pub fn new(device: &wgpu::Device, size: u32) -> Self {
        Self {
            radiance: create_cube(device, "probe_cube_radiance", size, CUBE_RADIANCE_FORMAT),
            normals: create_cube(device, "probe_cube_normals", size, CUBE_NORMALS_FORMAT),
            distance: create_cube(device, "probe_cube_distance", size, CUBE_DISTANCE_FORMAT),
            depth: create_cube(device, "probe_cube_depth", size, CUBE_DEPTH_FORMAT),
            size,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn radiance_face_view(&self, face: u32) -> wgpu::TextureView {
        face_view(&self.radiance, face, "probe_cube_radiance_face")
    }

    pub fn normals_face_view(&self, face: u32) -> wgpu::TextureView {
        face_view(&self.normals, face, "probe_cube_normals_face")
    }

    pub fn distance_face_view(&self, face: u32) -> wgpu::TextureView {
        face_view(&self.distance, face, "probe_cube_distance_face")
    }

    pub fn depth_face_view(&self, face: u32) -> wgpu::TextureView {
        face_view(&self.depth, face, "probe_cube_depth_face")
    }

    fn cube_view(texture: &wgpu::Texture, label: &str) -> wgpu::TextureView {
        texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(label),
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        })
    }

    pub fn radiance_cube_view(&self) -> wgpu::TextureView {
        Self::cube_view(&self.radiance, "probe_cube_radiance_view")
    }

    pub fn normals_cube_view(&self) -> wgpu::TextureView {
        Self::cube_view(&self.normals, "probe_cube_normals_view")
    }

    pub fn distance_cube_view(&self) -> wgpu::TextureView {
        Self::cube_view(&self.distance, "probe_cube_distance_view")
    }
}

/// The per-probe atlas arrays: octahedral projections plus the filtered
/// irradiance/distance layers. Layer `i` belongs to probe `i` and is written
/// exactly once per precompute pass over that probe.
pub struct ProbeAtlases {
    pub radiance: wgpu::Texture,
    pub normals: wgpu::Texture,
    pub distance_high: wgpu::Texture,
    pub distance_low: wgpu::Texture,
    pub irradiance: wgpu::Texture,
    pub filtered_distance: wgpu::Texture,
    octahedral_size: u32,
    low_size: u32,
    filter_size: u32,
    probe_count: u32,
}

impl ProbeAtlases {
    pub fn new(device: &wgpu::Device, config: &LucernaConfig, probe_count: u32) -> Self {
        let octa = config.octahedral_size;
        let low = config.low_octahedral_size();
        let filter = config.filter_size;
        Self {
            radiance: create_array(device, "atlas_radiance", octa, probe_count, ATLAS_RADIANCE_FORMAT),
            normals: create_array(device, "atlas_normals", octa, probe_count, ATLAS_NORMALS_FORMAT),
            distance_high: create_array(
                device,
                "atlas_distance_high",
                octa,
                probe_count,
                ATLAS_DISTANCE_FORMAT,
            ),
            distance_low: create_array(
                device,
                "atlas_distance_low",
                low,
                probe_count,
                ATLAS_DISTANCE_FORMAT,
            ),
            irradiance: create_array(
                device,
                "atlas_irradiance",
                filter,
                probe_count,
                ATLAS_IRRADIANCE_FORMAT,
            ),
            filtered_distance: create_array(
                device,
                "atlas_filtered_distance",
                filter,
                probe_count,
                ATLAS_FILTERED_DISTANCE_FORMAT,
            ),
            octahedral_size: octa,
            low_size: low,
            filter_size: filter,
            probe_count,
        }
    }

    pub fn probe_count(&self) -> u32 {
        self.probe_count
    }

    pub fn texture(&self, channel: ProbeChannel) -> &wgpu::Texture {
        match channel {
            ProbeChannel::Radiance => &self.radiance,
            ProbeChannel::Normals => &self.normals,
            ProbeChannel::DistanceHigh => &self.distance_high,
            ProbeChannel::DistanceLow => &self.distance_low,
            ProbeChannel::Irradiance => &self.irradiance,
            ProbeChannel::FilteredDistance => &self.filtered_distance,
        }
    }

    pub fn size(&self, channel: ProbeChannel) -> u32 {
        match channel {
            ProbeChannel::Radiance | ProbeChannel::Normals | ProbeChannel::DistanceHigh => {
                self.octahedral_size
            }
            ProbeChannel::DistanceLow => self.low_size,
            ProbeChannel::Irradiance | ProbeChannel::FilteredDistance => self.filter_size,
        }
    }

    /// D2 view of one probe's layer, for use as a render attachment.
    pub fn layer_view(&self, channel: ProbeChannel, layer: u32) -> wgpu::TextureView {
        self.texture(channel).create_view(&wgpu::TextureViewDescriptor {
            label: Some("atlas_layer"),
            dimension: Some(wgpu::TextureViewDimension::D2),
            base_array_layer: layer,
            array_layer_count: Some(1),
            ..Default::default()
        })
    }

    /// Whole-array view for sampling all probes at once.
    pub fn array_view(&self, channel: ProbeChannel) -> wgpu::TextureView {
        self.texture(channel).create_view(&wgpu::TextureViewDescriptor {
            label: Some("atlas_array"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        })
    }
}

/// One expected render attachment for [`validate_attachments`].
pub struct AttachmentSpec<'a> {
    pub texture: &'a wgpu::Texture,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

/// Check a pass's target set before encoding. The wgpu analogue of a
/// framebuffer completeness check: every attachment must be renderable at
/// the expected extent and format. A mismatch aborts the current precompute
/// invocation.
pub fn validate_attachments(label: &str, specs: &[AttachmentSpec]) -> Result<(), RenderError> {
    for (i, spec) in specs.iter().enumerate() {
        if !spec.texture.usage().contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
            return Err(RenderError::FramebufferIncomplete(format!(
                "{label}: attachment {i} is not renderable"
            )));
        }
        if spec.texture.format() != spec.format {
            return Err(RenderError::FramebufferIncomplete(format!(
                "{label}: attachment {i} format {:?}, expected {:?}",
                spec.texture.format(),
                spec.format
            )));
        }
        if spec.texture.width() != spec.width || spec.texture.height() != spec.height {
            return Err(RenderError::FramebufferIncomplete(format!(
                "{label}: attachment {i} extent {}x{}, expected {}x{}",
                spec.texture.width(),
                spec.texture.height(),
                spec.width,
                spec.height
            )));
        }
    }
    Ok(())
}

/// Directional light shadow map, rendered by the shadow pass and sampled by
/// both scene and capture shaders.
pub struct ShadowMap {
    pub texture: wgpu::Texture,
    size: u32,
}

impl ShadowMap {
    pub fn new(device: &wgpu::Device, size: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("shadow_map"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        Self { texture, size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn view(&self) -> wgpu::TextureView {
        self.texture.create_view(&Default::default())
    }
}

/// Swapchain-sized resources, recreated on resize.
pub struct FrameResources {
    pub depth: wgpu::Texture,
    width: u32,
    height: u32,
}

impl FrameResources {
    pub fn ensure_size(
        device: &wgpu::Device,
        existing: Option<Self>,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidParameter(
                "frame resources need a non-zero extent".to_string(),
            ));
        }
        if let Some(r) = existing {
            if r.width == width && r.height == height {
                return Ok(r);
            }
        }
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("frame_depth"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        Ok(Self {
            depth,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn depth_view(&self) -> wgpu::TextureView {
        self.depth.create_view(&Default::default())
    }
}
