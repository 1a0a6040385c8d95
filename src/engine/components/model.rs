use std::fmt;
use std::path::Path;

use crate::engine::components::gl_mesh::GlMesh;
use crate::engine::components::shader::GlShader;
use crate::engine::loaders::gltf_loader;
use crate::engine::managers::texture_manager::{texture_key, TextureManager};
use crate::engine::rendering::GlContext;

#[derive(Debug)]
pub enum ModelError {
    Import(gltf::Error),
    /// Some primitives or textures failed; everything else was loaded.
    Partial { loaded: usize, failures: Vec<String> },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Import(err) => write!(f, "Failed to import model: {}", err),
            ModelError::Partial { loaded, failures } => {
                write!(f, "Model loaded {} meshes with {} failures", loaded, failures.len())?;
                for failure in failures {
                    write!(f, "\n  - {}", failure)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl From<gltf::Error> for ModelError {
    fn from(err: gltf::Error) -> Self {
        ModelError::Import(err)
    }
}

/// Collection of GPU meshes imported from one glTF asset.
pub struct GlModel {
    ctx: GlContext,
    meshes: Vec<GlMesh>,
}

impl GlModel {
    pub fn new(ctx: &GlContext) -> Self {
        Self { ctx: ctx.clone(), meshes: Vec::new() }
    }

    /// Loads and requires every part to succeed.
    pub fn from_file(ctx: &GlContext, path: impl AsRef<Path>, textures: &mut TextureManager) -> Result<Self, ModelError> {
        let mut model = Self::new(ctx);
        model.load(path, textures)?;
        Ok(model)
    }

    /// Imports every triangle primitive of the asset and uploads it.
    ///
    /// Loading is best-effort: a broken primitive or texture is skipped, the
    /// rest is kept, and the failures are returned together as
    /// `ModelError::Partial`.
    pub fn load(&mut self, path: impl AsRef<Path>, textures: &mut TextureManager) -> Result<(), ModelError> {
        let path = path.as_ref();
        let asset = gltf_loader::open(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let model_key = texture_key(&path.to_string_lossy());

        let mut failures = Vec::new();
        let before = self.meshes.len();
        for (mesh, world) in gltf_loader::mesh_instances(&asset.document) {
            for primitive in mesh.primitives() {
                let label = format!("mesh {} primitive {}", mesh.index(), primitive.index());
                let cpu = match gltf_loader::read_primitive(&primitive, &asset.buffers, &world) {
                    Ok(cpu) => cpu,
                    Err(err) => {
                        failures.push(format!("{}: {}", label, err));
                        continue;
                    }
                };
                let mut part = GlMesh::new(&self.ctx, cpu);
                let mut texture_failures = Vec::new();
                let material_textures = gltf_loader::material_textures(
                    &primitive.material(),
                    &asset,
                    base_dir,
                    &model_key,
                    textures,
                    &mut texture_failures,
                );
                failures.extend(texture_failures.into_iter().map(|f| format!("{}: {}", label, f)));
                part.set_textures(material_textures);
                if let Err(err) = part.init_gl_context() {
                    failures.push(format!("{}: {}", label, err));
                    continue;
                }
                self.meshes.push(part);
            }
        }

        let loaded = self.meshes.len() - before;
        if failures.is_empty() {
            log::info!("Loaded model {} ({} meshes)", path.display(), loaded);
            Ok(())
        } else {
            for failure in failures.iter() {
                log::warn!("{}: {}", path.display(), failure);
            }
            Err(ModelError::Partial { loaded, failures })
        }
    }

    pub fn render(&self, shader: &GlShader) {
        for mesh in self.meshes.iter() {
            mesh.render(shader);
        }
    }

    pub fn meshes(&self) -> &[GlMesh] {
        &self.meshes
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}
