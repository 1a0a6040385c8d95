use std::path::Path;

use crate::engine::components::camera::Camera;
use crate::engine::components::gl_mesh::GlMesh;
use crate::engine::components::mesh::Mesh;
use crate::engine::components::model::{GlModel, ModelError};
use crate::engine::components::shader::{GlShader, ShaderStage};
use crate::engine::managers::texture_manager::TextureManager;
use crate::engine::rendering::GlContext;
use crate::engine::systems::scene_format::SceneDescription;
use crate::engine::systems::viewer_app::ViewerApp;
use crate::engine::utils::input_utils::{Key, KeyState, MouseButton};

// ============================================================================
// Built-in shaders
// ============================================================================

const MESH_VERTEX_SHADER: &str = r#"#version 330 core
layout (location = 0) in vec3 position;
layout (location = 1) in vec3 normal;
layout (location = 2) in vec2 tex_coord;

uniform mat4 camera;

out vec3 frag_normal;
out vec2 frag_tex_coord;

void main() {
    frag_normal = normal;
    frag_tex_coord = tex_coord;
    gl_Position = camera * vec4(position, 1.0);
}
"#;

const TEXTURED_FRAGMENT_SHADER: &str = r#"#version 330 core
struct Material {
    sampler2D diffuse;
    sampler2D normal;
    sampler2D specular;
};

uniform Material texture_material[1];

in vec3 frag_normal;
in vec2 frag_tex_coord;
out vec4 color;

void main() {
    float light = max(dot(normalize(frag_normal), normalize(vec3(0.3, 1.0, 0.5))), 0.2);
    color = vec4(texture(texture_material[0].diffuse, frag_tex_coord).rgb * light, 1.0);
}
"#;

const NORMALS_FRAGMENT_SHADER: &str = r#"#version 330 core
in vec3 frag_normal;
in vec2 frag_tex_coord;
out vec4 color;

void main() {
    color = vec4(normalize(frag_normal) * 0.5 + 0.5, 1.0);
}
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingMode {
    Textured,
    Normals,
}

impl ShadingMode {
    fn fragment_source(self) -> &'static str {
        match self {
            ShadingMode::Textured => TEXTURED_FRAGMENT_SHADER,
            ShadingMode::Normals => NORMALS_FRAGMENT_SHADER,
        }
    }
}

enum Drawable {
    Model(GlModel),
    Mesh(GlMesh),
}

impl Drawable {
    fn render(&self, shader: &GlShader) {
        match self {
            Drawable::Model(model) => model.render(shader),
            Drawable::Mesh(mesh) => mesh.render(shader),
        }
    }
}

fn is_gltf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("gltf") || e.eq_ignore_ascii_case("glb"))
}

/// Renders the scene's model through one shader with an arc-ball camera.
pub struct ModelViewer {
    mode: ShadingMode,
    camera: Camera,
    drawable: Option<Drawable>,
    shader: Option<GlShader>,
    textures: Option<TextureManager>,
}

impl ModelViewer {
    pub fn new(mode: ShadingMode) -> Self {
        Self { mode, camera: Camera::new(), drawable: None, shader: None, textures: None }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn mode(&self) -> ShadingMode {
        self.mode
    }

    fn build_shader(&self, ctx: &GlContext, scene: &SceneDescription) -> Result<GlShader, Box<dyn std::error::Error>> {
        let mut shader = GlShader::new(ctx);
        if scene.shaders.is_empty() {
            shader.add_source(MESH_VERTEX_SHADER, ShaderStage::Vertex)?;
            shader.add_source(self.mode.fragment_source(), ShaderStage::Fragment)?;
        } else {
            shader.init(&scene.shaders)?;
        }
        shader.finalize()?;
        Ok(shader)
    }

    fn load_drawable(
        ctx: &GlContext,
        path: &Path,
        scene: &SceneDescription,
        textures: &mut TextureManager,
    ) -> Result<Drawable, Box<dyn std::error::Error>> {
        if is_gltf(path) {
            let mut model = GlModel::new(ctx);
            match model.load(path, textures) {
                Ok(()) => {}
                // Keep whatever was imported; the failures are already logged.
                Err(ModelError::Partial { .. }) if !model.is_empty() => {}
                Err(err) => return Err(err.into()),
            }
            return Ok(Drawable::Model(model));
        }

        let mut mesh = Mesh::new_from_file(path)?;
        if mesh.normal.is_empty() {
            mesh.compute_vertex_normal();
        }
        let mut gl_mesh = GlMesh::new(ctx, mesh);
        for texture in &scene.textures {
            match textures.add(&texture.to_string_lossy(), "") {
                Ok(texture) => gl_mesh.add_texture(texture),
                Err(err) => log::warn!("Skipping texture {}: {}", texture.display(), err),
            }
        }
        gl_mesh.init_gl_context()?;
        Ok(Drawable::Mesh(gl_mesh))
    }
}

impl ViewerApp for ModelViewer {
    fn init(&mut self, ctx: &GlContext, scene: &SceneDescription) -> Result<(), Box<dyn std::error::Error>> {
        self.camera = scene.create_camera()?;

        let mut textures = TextureManager::new(ctx);
        textures.set_wrapping_mode(scene.wrapping);
        textures.set_interpolation_mode(scene.interpolation);

        self.shader = Some(self.build_shader(ctx, scene)?);
        self.drawable = match &scene.model {
            Some(path) => Some(Self::load_drawable(ctx, path, scene, &mut textures)?),
            None => {
                log::warn!("Scene '{}' has no model to display", scene.scene_name);
                None
            }
        };
        self.textures = Some(textures);

        ctx.gl().enable(glow::DEPTH_TEST);
        ctx.gl().clear_color(0.1, 0.1, 0.12, 1.0);
        Ok(())
    }

    fn render(&mut self, ctx: &GlContext) {
        ctx.gl().clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        let (Some(shader), Some(drawable)) = (&self.shader, &self.drawable) else {
            return;
        };
        if let Err(err) = shader.use_program() {
            log::error!("Cannot render: {}", err);
            return;
        }
        shader.set_uniform_matrix4("camera", &self.camera.transform());
        drawable.render(shader);
        shader.stop_using();
    }

    fn on_keyboard(&mut self, key: Key, state: KeyState, dt: f32) {
        self.camera.on_keyboard(key, state, dt);
    }

    fn on_mouse_click(&mut self, button: MouseButton, state: KeyState, x: f32, y: f32) {
        self.camera.on_mouse_click(button, state, x, y);
    }

    fn on_mouse_move(&mut self, x: f32, y: f32) {
        self.camera.on_mouse_move(x, y);
    }

    fn on_resize(&mut self, ctx: &GlContext, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.set_window_dimension(width, height);
        ctx.gl().viewport(0, 0, width as i32, height as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::components::mesh::tests::{scratch_dir, CUBE_OBJ};
    use crate::engine::rendering::recording_gl::{Call, RecordingGl};

    fn cube_scene(tag: &str) -> SceneDescription {
        let dir = scratch_dir(tag);
        let path = dir.join("cube.obj");
        std::fs::write(&path, CUBE_OBJ).unwrap();
        SceneDescription { model: Some(path), ..SceneDescription::default() }
    }

    #[test]
    fn renders_mesh_with_camera_transform() {
        let gl = RecordingGl::new();
        let ctx = gl.context();
        let scene = cube_scene("viewer-mesh");
        let mut viewer = ModelViewer::new(ShadingMode::Normals);
        viewer.init(&ctx, &scene).unwrap();

        gl.clear_calls();
        viewer.render(&ctx);
        let calls = gl.calls();
        let camera = viewer.camera().transform();
        assert!(calls.iter().any(|c| matches!(c,
            Call::UniformMatrix { name, dim: 4, values, .. } if name == "camera" && values[..] == camera.m[..])));
        assert!(calls.iter().any(|c| matches!(c, Call::DrawElements { count: 36, .. })));
        assert_eq!(calls.last(), Some(&Call::UseProgram(None)));
    }

    #[test]
    fn missing_model_still_initializes() {
        let gl = RecordingGl::new();
        let ctx = gl.context();
        let mut viewer = ModelViewer::new(ShadingMode::Textured);
        viewer.init(&ctx, &SceneDescription::default()).unwrap();
        gl.clear_calls();
        viewer.render(&ctx);
        assert!(!gl.calls().iter().any(|c| matches!(c, Call::DrawElements { .. })));
    }

    #[test]
    fn shader_failure_is_reported() {
        let gl = RecordingGl::new();
        gl.fail_compile_on("texture_material");
        let ctx = gl.context();
        let mut viewer = ModelViewer::new(ShadingMode::Textured);
        assert!(viewer.init(&ctx, &cube_scene("viewer-bad-shader")).is_err());
    }

    #[test]
    fn resize_updates_aspect() {
        let gl = RecordingGl::new();
        let ctx = gl.context();
        let mut viewer = ModelViewer::new(ShadingMode::Normals);
        viewer.on_resize(&ctx, 800, 400);
        assert_eq!(viewer.camera().aspect(), 2.0);
        viewer.on_resize(&ctx, 0, 400);
        assert_eq!(viewer.camera().aspect(), 2.0);
    }
}
