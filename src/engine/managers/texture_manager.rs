use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::engine::components::texture::{GlTexture, InterpolationMode, TextureError, TextureType, WrappingMode};
use crate::engine::loaders::image_loader::Image;
use crate::engine::rendering::GlContext;

/// Owns every texture it loads, keyed by a logical name.
///
/// Textures are handed out as `Rc` so meshes can share them; the GPU object
/// lives until both the manager entry and every mesh referencing it are gone.
pub struct TextureManager {
    ctx: GlContext,
    textures: HashMap<String, Rc<GlTexture>>,
    wrapping: WrappingMode,
    interpolation: InterpolationMode,
}

/// Key derived from a file name: the stem (`textures/brick_D.png` -> `brick_D`).
pub fn texture_key(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}

/// Infers the semantic slot from a stem suffix such as `_D`, `_normal` or `_s`.
pub fn infer_texture_type(stem: &str) -> TextureType {
    let lower = stem.to_ascii_lowercase();
    let suffix = lower.rsplit_once('_').map(|(_, s)| s).unwrap_or_default();
    match suffix {
        "n" | "normal" | "nrm" => TextureType::Normal,
        "s" | "specular" | "spec" => TextureType::Specular,
        _ => TextureType::Diffuse,
    }
}

impl TextureManager {
    pub fn new(ctx: &GlContext) -> Self {
        Self {
            ctx: ctx.clone(),
            textures: HashMap::new(),
            wrapping: WrappingMode::ClampToBorder,
            interpolation: InterpolationMode::Linear,
        }
    }

    /// Loads `filename` under `id` (or its stem when `id` is empty).
    /// An existing key returns the cached texture without touching the file.
    pub fn add(&mut self, filename: &str, id: &str) -> Result<Rc<GlTexture>, TextureError> {
        let ty = infer_texture_type(&texture_key(filename));
        self.add_as(filename, id, ty)
    }

    pub fn add_as(&mut self, filename: &str, id: &str, ty: TextureType) -> Result<Rc<GlTexture>, TextureError> {
        let key = if id.is_empty() { texture_key(filename) } else { id.to_string() };
        if let Some(existing) = self.cached(&key, ty) {
            return Ok(existing);
        }
        let image = Image::load(filename).map_err(|err| {
            log::warn!("Texture '{}' not loaded from {}: {}", key, filename, err);
            TextureError::Image(err)
        })?;
        self.insert(key, &image, ty)
    }

    /// Uploads already decoded pixels under `key`.
    pub fn add_image(&mut self, key: &str, image: &Image, ty: TextureType) -> Result<Rc<GlTexture>, TextureError> {
        if let Some(existing) = self.cached(key, ty) {
            return Ok(existing);
        }
        self.insert(key.to_string(), image, ty)
    }

    /// The cached entry keeps the type it was first loaded with.
    fn cached(&self, key: &str, ty: TextureType) -> Option<Rc<GlTexture>> {
        let existing = self.textures.get(key)?;
        if existing.texture_type() != ty {
            log::warn!(
                "Texture '{}' requested as {} but cached as {}",
                key,
                ty.as_str(),
                existing.texture_type().as_str()
            );
        }
        Some(Rc::clone(existing))
    }

    fn insert(&mut self, key: String, image: &Image, ty: TextureType) -> Result<Rc<GlTexture>, TextureError> {
        let texture = GlTexture::from_image(&self.ctx, image, ty, self.wrapping, self.interpolation)?;
        log::info!(
            "Texture '{}' uploaded ({}x{}, {})",
            key,
            texture.width(),
            texture.height(),
            ty.as_str()
        );
        let texture = Rc::new(texture);
        self.textures.insert(key, Rc::clone(&texture));
        Ok(texture)
    }

    /// Removes `id`, or every texture when `id` is empty.
    pub fn remove(&mut self, id: &str) {
        if id.is_empty() {
            self.textures.clear();
        } else {
            self.textures.remove(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Rc<GlTexture>> {
        self.textures.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.textures.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn wrapping_mode(&self) -> WrappingMode {
        self.wrapping
    }

    /// Applies to textures loaded from now on.
    pub fn set_wrapping_mode(&mut self, mode: WrappingMode) {
        self.wrapping = mode;
    }

    pub fn interpolation_mode(&self) -> InterpolationMode {
        self.interpolation
    }

    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.interpolation = mode;
    }
}
