//! Trait for render backends. The host uses this to call prepare/render_frame
//! without depending on the renderer crate.

use crate::{ExtractedScene, FrameInput};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// Render backend driven by the host once per tick.
pub trait RenderBackend: Send {
    /// Prepare phase: upload extracted meshes and textures to the GPU.
    fn prepare(&mut self, scene: &ExtractedScene);

    /// Render one frame (and run at most one probe precompute step when the
    /// frame requests it). Submits work internally.
    fn render_frame(&mut self, frame: &FrameInput) -> Result<(), String>;
}

/// Extension for backends that can present to a window. The host passes raw
/// handles (e.g. from winit); the backend owns surface configuration and
/// performs get_current_texture + present internally.
pub trait RenderBackendWindow: RenderBackend + Send {
    fn render_frame_to_window(
        &mut self,
        frame: &FrameInput,
        raw_window_handle: RawWindowHandle,
        raw_display_handle: RawDisplayHandle,
    ) -> Result<(), String>;
}
