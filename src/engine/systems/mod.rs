pub mod model_viewer;
pub mod scene_format;
pub mod viewer_app;

pub use model_viewer::{ModelViewer, ShadingMode};
pub use scene_format::{SceneDescription, SceneError};
pub use viewer_app::{find_app, AppEntry, ViewerApp, APPS};
