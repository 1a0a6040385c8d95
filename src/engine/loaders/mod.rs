pub mod gltf_loader;
pub mod image_loader;
pub mod obj_format;
pub mod ply_format;
pub mod tri_format;

pub use image_loader::{Image, ImageError, PixelFormat};
