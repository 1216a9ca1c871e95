//! Shared render API for Lucerna.
//! Defines the extraction types the host fills, the light sources with their
//! derived matrices, the runtime-tunable settings surface, and the
//! RenderBackend trait the host drives each tick.

mod backend;
mod extract;
mod lights;
mod settings;

pub use backend::{RenderBackend, RenderBackendWindow};
pub use extract::{
    ExtractedMesh, ExtractedScene, ExtractedView, FrameInput, MaterialTextures, SpotLightState,
    SunState, TextureData, VERTEX_STRIDE,
};
pub use lights::{DirectionalLight, SpotLight};
pub use settings::{ProbeChannel, RenderSettings};
pub use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
