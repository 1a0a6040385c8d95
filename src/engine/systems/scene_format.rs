use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::components::camera::{Camera, CameraError};
use crate::engine::components::texture::{InterpolationMode, WrappingMode};
use crate::engine::utils::math::Vector3;

#[derive(Debug)]
pub enum SceneError {
    FileNotFound(String),
    UnsupportedFormat(String),
    JsonParseError(serde_json::Error),
    IoError(std::io::Error),
    Camera(CameraError),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::FileNotFound(path) => write!(f, "File not found: {}", path),
            SceneError::UnsupportedFormat(path) => write!(f, "Scene files must be .json: {}", path),
            SceneError::JsonParseError(err) => write!(f, "JSON parse error: {}", err),
            SceneError::IoError(err) => write!(f, "IO error: {}", err),
            SceneError::Camera(err) => write!(f, "Invalid camera parameters: {}", err),
        }
    }
}

impl std::error::Error for SceneError {}

impl From<CameraError> for SceneError {
    fn from(err: CameraError) -> Self {
        SceneError::Camera(err)
    }
}

/// Projection parameters; `fov` is in degrees.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CameraParameters {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Default for CameraParameters {
    fn default() -> Self {
        Self { fov: 45.0, near: 0.1, far: 100.0, aspect: 4.0 / 3.0 }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CameraDescription {
    pub position: [f32; 3],
    pub target: [f32; 3],
    #[serde(default)]
    pub parameters: CameraParameters,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self { position: [0.0, 0.0, 5.0], target: [0.0, 0.0, 0.0], parameters: CameraParameters::default() }
    }
}

fn default_wrapping() -> WrappingMode {
    WrappingMode::ClampToBorder
}

fn default_interpolation() -> InterpolationMode {
    InterpolationMode::Linear
}

fn default_move_speed() -> f32 {
    1.0
}

/// Scene file format
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SceneDescription {
    #[serde(default = "default_scene_name")]
    pub scene_name: String,
    #[serde(default)]
    pub camera: CameraDescription,
    /// glTF model, or a mesh file (obj/ply/tri).
    #[serde(default)]
    pub model: Option<PathBuf>,
    #[serde(default)]
    pub shaders: Vec<PathBuf>,
    #[serde(default)]
    pub textures: Vec<PathBuf>,
    #[serde(default = "default_wrapping")]
    pub wrapping: WrappingMode,
    #[serde(default = "default_interpolation")]
    pub interpolation: InterpolationMode,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
}

fn default_scene_name() -> String {
    "no_name".to_string()
}

impl Default for SceneDescription {
    fn default() -> Self {
        Self {
            scene_name: default_scene_name(),
            camera: CameraDescription::default(),
            model: None,
            shaders: Vec::new(),
            textures: Vec::new(),
            wrapping: default_wrapping(),
            interpolation: default_interpolation(),
            move_speed: default_move_speed(),
        }
    }
}

impl SceneDescription {
    pub fn from_str(json: &str) -> Result<Self, SceneError> {
        serde_json::from_str(json).map_err(SceneError::JsonParseError)
    }

    /// Reads a scene file; relative asset paths are resolved against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if !is_json {
            return Err(SceneError::UnsupportedFormat(path.display().to_string()));
        }
        if !path.exists() {
            return Err(SceneError::FileNotFound(path.display().to_string()));
        }
        let json = std::fs::read_to_string(path).map_err(SceneError::IoError)?;
        let mut scene = Self::from_str(&json)?;
        if let Some(dir) = path.parent() {
            scene.resolve_paths(dir);
        }
        log::info!("Loaded scene '{}' from {}", scene.scene_name, path.display());
        Ok(scene)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json = serde_json::to_string_pretty(self).map_err(SceneError::JsonParseError)?;
        std::fs::write(path, json).map_err(SceneError::IoError)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(model) = self.model.as_mut() {
            resolve(model);
        }
        self.shaders.iter_mut().for_each(resolve);
        self.textures.iter_mut().for_each(resolve);
    }

    /// Builds the camera described by the scene, with its projection applied.
    pub fn create_camera(&self) -> Result<Camera, SceneError> {
        let mut camera = Camera::new();
        let p = self.camera.parameters;
        camera.update_projection_transform(p.fov, p.near, p.far, p.aspect)?;
        camera.look_at(Vector3::from(self.camera.position), Vector3::from(self.camera.target));
        camera.set_move_speed(self.move_speed);
        Ok(camera)
    }
}
