use once_cell::sync::Lazy;

use crate::engine::rendering::GlContext;
use crate::engine::systems::model_viewer::{ModelViewer, ShadingMode};
use crate::engine::systems::scene_format::SceneDescription;
use crate::engine::utils::input_utils::{Key, KeyState, MouseButton};

/// A demo driven by the viewer window's callbacks.
pub trait ViewerApp {
    fn init(&mut self, ctx: &GlContext, scene: &SceneDescription) -> Result<(), Box<dyn std::error::Error>>;
    fn render(&mut self, ctx: &GlContext);
    fn on_keyboard(&mut self, key: Key, state: KeyState, dt: f32);
    fn on_mouse_click(&mut self, button: MouseButton, state: KeyState, x: f32, y: f32);
    fn on_mouse_move(&mut self, x: f32, y: f32);
    fn on_resize(&mut self, ctx: &GlContext, width: u32, height: u32);
}

pub struct AppEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub create: fn() -> Box<dyn ViewerApp>,
}

/// Every demo the viewer can launch, by name.
pub static APPS: Lazy<Vec<AppEntry>> = Lazy::new(|| {
    vec![
        AppEntry {
            name: "model-loader",
            description: "Textured model with an arc-ball camera",
            create: || Box::new(ModelViewer::new(ShadingMode::Textured)),
        },
        AppEntry {
            name: "normals",
            description: "Model shaded by its vertex normals",
            create: || Box::new(ModelViewer::new(ShadingMode::Normals)),
        },
    ]
});

pub fn find_app(name: &str) -> Option<&'static AppEntry> {
    APPS.iter().find(|entry| entry.name == name)
}

pub fn app_names() -> Vec<&'static str> {
    APPS.iter().map(|entry| entry.name).collect()
}
