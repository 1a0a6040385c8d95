pub mod camera;
pub mod gl_mesh;
pub mod mesh;
pub mod model;
pub mod shader;
pub mod texture;

pub use camera::{Camera, CameraError, CameraState};
pub use gl_mesh::{BufferSlot, GlMesh, GlMeshError};
pub use mesh::{Aabb, Mesh, MeshError, MeshFormat};
pub use model::{GlModel, ModelError};
pub use shader::{GlShader, ShaderError, ShaderStage, ShaderState};
pub use texture::{GlTexture, InterpolationMode, TextureError, TextureType, WrappingMode};
