//! Lucerna bridge: owns the wgpu instance and renderer, implements the
//! RenderBackend traits for the host.

mod plugin;
mod window_backend;

pub use plugin::LucernaPlugin;
pub use window_backend::LucernaWindowBackend;
