pub mod texture_manager;

pub use texture_manager::TextureManager;
