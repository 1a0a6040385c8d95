pub mod gl_api;
pub mod gl_context;
#[cfg(test)]
pub mod recording_gl;

pub use gl_api::{GlApi, GlowBackend};
pub use gl_context::{GlContext, GlError};
