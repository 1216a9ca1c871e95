//! Lucerna configuration: probe grid placement, texture resolutions, shadow
//! map size, swapchain format.

/// Renderer configuration, fixed at construction. Runtime tunables live in
/// `render_api::RenderSettings` instead.
#[derive(Clone, Debug)]
pub struct LucernaConfig {
    /// Edge length of each probe cubemap face.
    pub cubemap_size: u32,
    /// Edge length of the high-resolution octahedral layers.
    pub octahedral_size: u32,
    /// `octahedral_size / low_downsample` is the low-resolution distance
    /// layer edge length.
    pub low_downsample: u32,
    /// Edge length of the irradiance / filtered-distance layers.
    pub filter_size: u32,
    pub shadow_map_size: u32,
    /// Constant ambient term used where probe GI is unavailable
    /// (the precompute capture shader).
    pub ambient_color: [f32; 4],
    /// Swapchain texture format for the scene and debug passes.
    pub swapchain_format: wgpu::TextureFormat,
    /// Probe lattice: world-space origin, per-axis step, per-axis counts.
    pub probe_origin: [f32; 3],
    pub probe_step: [f32; 3],
    pub probe_counts: [u32; 3],
}

impl Default for LucernaConfig {
    fn default() -> Self {
        Self {
            cubemap_size: 256,
            octahedral_size: 1024,
            low_downsample: 16,
            filter_size: 128,
            shadow_map_size: 4096,
            ambient_color: [0.25, 0.25, 0.25, 1.0],
            swapchain_format: wgpu::TextureFormat::Rgba8Unorm,
            probe_origin: [-3.0, 1.0, -3.0],
            probe_step: [2.0, 2.0, 2.0],
            probe_counts: [4, 2, 4],
        }
    }
}

impl LucernaConfig {
    pub fn low_octahedral_size(&self) -> u32 {
        self.octahedral_size / self.low_downsample
    }
}
