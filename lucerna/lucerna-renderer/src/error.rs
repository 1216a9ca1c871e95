//! Renderer error taxonomy.

use thiserror::Error;

/// Errors surfaced by the renderer. No retries anywhere: failures are either
/// fatal to the current precompute invocation (logged, cursor advances) or
/// fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// A render target set does not match what a pass expects (extent,
    /// format, or usage). Fatal to the current precompute invocation.
    #[error("framebuffer incomplete: {0}")]
    FramebufferIncomplete(String),

    /// The platform lacks a required GPU feature or limit. Fatal at startup;
    /// no rendering is attempted.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// An invalid parameter was provided.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Any other backend failure.
    #[error("graphics error: {0}")]
    Graphics(String),
}
