//! OpenGL toolkit: meshes and glTF models, shader programs, a texture cache,
//! an arc-ball camera and the small linear algebra they share.

pub mod engine;

pub use engine::*;
