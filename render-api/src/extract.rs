//! Data types for extraction from the host into the render world.
//! The host fills an ExtractedScene once (or whenever assets change) and a
//! FrameInput every tick.

use std::collections::HashMap;

use crate::settings::RenderSettings;

/// Interleaved vertex layout: position (3), normal (3), uv (2), tangent (4).
pub const VERTEX_STRIDE: u64 = 48;

/// Raw RGBA8 pixel data for upload.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Material texture set for one mesh. Missing maps fall back to renderer
/// defaults; a missing diffuse map falls back to `diffuse_color`.
#[derive(Clone, Debug, Default)]
pub struct MaterialTextures {
    pub diffuse: Option<TextureData>,
    pub diffuse_color: [f32; 3],
    pub specular: Option<TextureData>,
    pub normal: Option<TextureData>,
}

/// Per-mesh instance data extracted from the host.
#[derive(Clone, Debug)]
pub struct ExtractedMesh {
    /// Host-defined entity or instance id.
    pub entity_id: u64,
    /// Interleaved vertex data (see VERTEX_STRIDE), triangle-expanded,
    /// drawn non-indexed.
    pub vertex_data: Vec<u8>,
    /// World transform: column-major 4x4 matrix (WGSL/wgpu convention).
    pub transform: [f32; 16],
    pub visible: bool,
    pub material: MaterialTextures,
}

/// Everything the renderer needs to know about the scene between frames.
#[derive(Default, Debug)]
pub struct ExtractedScene {
    pub meshes: HashMap<u64, ExtractedMesh>,
    /// Equirectangular environment map, if any.
    pub environment: Option<TextureData>,
}

/// View/camera data for the current frame.
#[derive(Clone, Debug)]
pub struct ExtractedView {
    /// World-to-view matrix, column-major.
    pub view: [f32; 16],
    /// View-to-clip matrix, column-major.
    pub projection: [f32; 16],
    pub camera_position: [f32; 3],
    pub viewport_size: (u32, u32),
}

impl Default for ExtractedView {
    fn default() -> Self {
        const IDENTITY: [f32; 16] = [
            1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0,
        ];
        Self {
            view: IDENTITY,
            projection: IDENTITY,
            camera_position: [0.0; 3],
            viewport_size: (800, 600),
        }
    }
}

/// Directional light state resolved by the host for one frame
/// (see [`crate::DirectionalLight`] for the lazily derived matrix).
#[derive(Clone, Copy, Debug)]
pub struct SunState {
    pub direction: [f32; 3],
    pub color: [f32; 3],
    /// Orthographic shadow view-projection, column-major.
    pub view_projection: [f32; 16],
}

/// Spot light state resolved by the host for one frame.
#[derive(Clone, Copy, Debug)]
pub struct SpotLightState {
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub color: [f32; 3],
    /// Full cone angle in radians.
    pub cone_angle: f32,
}

/// Per-tick input: camera, lights, settings, and the precompute trigger.
#[derive(Clone, Debug)]
pub struct FrameInput {
    pub view: ExtractedView,
    pub sun: SunState,
    pub spot: SpotLightState,
    pub settings: RenderSettings,
    /// Set when the manual precompute key was pressed since the last tick;
    /// consumed once per tick.
    pub precompute_requested: bool,
}
