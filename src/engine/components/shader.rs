use std::fmt;
use std::path::{Path, PathBuf};

use crate::engine::rendering::{GlContext, GlError};
use crate::engine::utils::math::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

// ================================================================================================
// ERRORS
// ================================================================================================

#[derive(Debug)]
pub enum ShaderError {
    Io { path: PathBuf, source: std::io::Error },
    UnknownStage(PathBuf),
    Create(String),
    Compile { stage: ShaderStage, log: String },
    Link { log: String },
    InvalidState(ShaderState),
    NotLinked,
    Gl(GlError),
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::Io { path, source } => write!(f, "Cannot read shader {}: {}", path.display(), source),
            ShaderError::UnknownStage(path) => {
                write!(f, "Cannot infer shader stage of {} (expected .vs, .gs or .fs)", path.display())
            }
            ShaderError::Create(msg) => write!(f, "Failed to create shader object: {}", msg),
            ShaderError::Compile { stage, log } => write!(f, "{} shader compilation failed:\n{}", stage.as_str(), log),
            ShaderError::Link { log } => write!(f, "Shader program link failed:\n{}", log),
            ShaderError::InvalidState(state) => write!(f, "Operation not allowed in shader state {:?}", state),
            ShaderError::NotLinked => write!(f, "Shader program is not linked"),
            ShaderError::Gl(err) => write!(f, "OpenGL error after linking: {}", err),
        }
    }
}

impl std::error::Error for ShaderError {}

impl From<GlError> for ShaderError {
    fn from(err: GlError) -> Self {
        ShaderError::Gl(err)
    }
}

// ================================================================================================
// STAGES AND STATE
// ================================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Geometry,
    Fragment,
}

impl ShaderStage {
    /// Stage from the file extension: `vs`, `gs` or `fs`.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str())? {
            "vs" => Some(ShaderStage::Vertex),
            "gs" => Some(ShaderStage::Geometry),
            "fs" => Some(ShaderStage::Fragment),
            _ => None,
        }
    }

    pub fn gl_enum(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Geometry => "geometry",
            ShaderStage::Fragment => "fragment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderState {
    Uninitialized,
    Compiling,
    Linked,
    Failed,
}

// ================================================================================================
// SHADER PROGRAM
// ================================================================================================

/// A linked GLSL program and the stage objects waiting to be linked into it.
pub struct GlShader {
    ctx: GlContext,
    program: Option<glow::Program>,
    stages: Vec<glow::Shader>,
    state: ShaderState,
}

macro_rules! uniform_setters {
    ($($n:literal $suffix:ident $ty:ident [$($arg:ident),+];)*) => {
        paste::paste! {
            $(
                pub fn [<set_uniform_ $n $suffix>](&self, name: &str, $($arg: $ty),+) {
                    self.[<set_uniform_ $n $suffix v>](name, &[$($arg),+]);
                }

                pub fn [<set_uniform_ $n $suffix v>](&self, name: &str, values: &[$ty]) {
                    let location = self.active_uniform_location(name);
                    self.ctx.gl().[<uniform_ $n _ $ty _slice>](location.as_ref(), values);
                }
            )*
        }
    };
}

macro_rules! attrib_setters {
    ($($n:literal [$($arg:ident),+];)*) => {
        paste::paste! {
            $(
                pub fn [<set_attrib_ $n f>](&self, name: &str, $($arg: f32),+) {
                    self.[<set_attrib_ $n fv>](name, &[$($arg),+]);
                }

                pub fn [<set_attrib_ $n fv>](&self, name: &str, values: &[f32]) {
                    if let Some(index) = self.active_attrib_location(name) {
                        self.ctx.gl().[<vertex_attrib_ $n _f32_slice>](index, values);
                    }
                }
            )*
        }
    };
}

impl GlShader {
    pub fn new(ctx: &GlContext) -> Self {
        Self {
            ctx: ctx.clone(),
            program: None,
            stages: Vec::new(),
            state: ShaderState::Uninitialized,
        }
    }

    /// Creates the program and compiles every stage file in `paths`.
    pub fn init<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), ShaderError> {
        self.ensure_program()?;
        for path in paths {
            self.add_file(path)?;
        }
        Ok(())
    }

    /// Compiles a stage file; the stage comes from the extension.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<(), ShaderError> {
        let path = path.as_ref();
        let stage = ShaderStage::from_path(path).ok_or_else(|| ShaderError::UnknownStage(path.to_path_buf()))?;
        let code = std::fs::read_to_string(path).map_err(|source| ShaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.add_source(&code, stage).inspect_err(|_| {
            log::error!("Shader stage {} failed to compile", path.display());
        })
    }

    pub fn add_source(&mut self, code: &str, stage: ShaderStage) -> Result<(), ShaderError> {
        if matches!(self.state, ShaderState::Failed | ShaderState::Linked) {
            return Err(ShaderError::InvalidState(self.state));
        }
        let program = self.ensure_program()?;
        let gl = self.ctx.gl();
        let shader = gl.create_shader(stage.gl_enum()).map_err(ShaderError::Create)?;
        gl.shader_source(shader, code);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            self.state = ShaderState::Failed;
            return Err(ShaderError::Compile { stage, log });
        }
        gl.attach_shader(program, shader);
        self.stages.push(shader);
        self.state = ShaderState::Compiling;
        Ok(())
    }

    /// Links the attached stages; the stage objects are released on success.
    pub fn finalize(&mut self) -> Result<(), ShaderError> {
        let program = match (self.state, self.program) {
            (ShaderState::Compiling, Some(program)) => program,
            (state, _) => return Err(ShaderError::InvalidState(state)),
        };
        let gl = self.ctx.gl();
        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            self.state = ShaderState::Failed;
            return Err(ShaderError::Link { log: gl.get_program_info_log(program) });
        }
        for shader in self.stages.drain(..) {
            gl.detach_shader(program, shader);
            gl.delete_shader(shader);
        }
        if let Err(err) = self.ctx.check_error() {
            self.state = ShaderState::Failed;
            return Err(err.into());
        }
        self.state = ShaderState::Linked;
        log::info!("Shader program {:?} linked", program);
        Ok(())
    }

    /// Makes this the active program.
    pub fn use_program(&self) -> Result<(), ShaderError> {
        match (self.state, self.program) {
            (ShaderState::Linked, Some(program)) => {
                self.ctx.set_active_program(Some(program));
                Ok(())
            }
            _ => Err(ShaderError::NotLinked),
        }
    }

    pub fn stop_using(&self) {
        if self.is_using() {
            self.ctx.set_active_program(None);
        }
    }

    pub fn is_using(&self) -> bool {
        self.program.is_some() && self.ctx.active_program() == self.program
    }

    pub fn state(&self) -> ShaderState {
        self.state
    }

    pub fn program(&self) -> Option<glow::Program> {
        self.program
    }

    pub fn attrib_location(&self, name: &str) -> Option<u32> {
        self.program.and_then(|p| self.ctx.gl().get_attrib_location(p, name))
    }

    pub fn uniform_location(&self, name: &str) -> Option<glow::UniformLocation> {
        self.program.and_then(|p| self.ctx.gl().get_uniform_location(p, name))
    }

    fn ensure_program(&mut self) -> Result<glow::Program, ShaderError> {
        match self.program {
            Some(program) => Ok(program),
            None => {
                let program = self.ctx.gl().create_program().map_err(ShaderError::Create)?;
                self.program = Some(program);
                Ok(program)
            }
        }
    }

    fn assert_using(&self, name: &str) {
        assert!(self.is_using(), "shader variable '{}' set while the program is not in use", name);
    }

    fn active_uniform_location(&self, name: &str) -> Option<glow::UniformLocation> {
        self.assert_using(name);
        self.uniform_location(name)
    }

    fn active_attrib_location(&self, name: &str) -> Option<u32> {
        self.assert_using(name);
        let location = self.attrib_location(name);
        if location.is_none() {
            log::warn!("Attribute '{}' is not active in program {:?}", name, self.program);
        }
        location
    }

    // --------------------------------------------------------------------------------------------
    // Uniform and attribute setters. All of them panic unless the program is in use.
    // --------------------------------------------------------------------------------------------

    uniform_setters! {
        1 f f32 [x];
        2 f f32 [x, y];
        3 f f32 [x, y, z];
        4 f f32 [x, y, z, w];
        1 i i32 [x];
        2 i i32 [x, y];
        3 i i32 [x, y, z];
        4 i i32 [x, y, z, w];
        1 ui u32 [x];
        2 ui u32 [x, y];
        3 ui u32 [x, y, z];
        4 ui u32 [x, y, z, w];
    }

    attrib_setters! {
        1 [x];
        2 [x, y];
        3 [x, y, z];
        4 [x, y, z, w];
    }

    /// `values` holds one or more 3x3 matrices.
    pub fn set_uniform_mat3(&self, name: &str, values: &[f32], transpose: bool) {
        let location = self.active_uniform_location(name);
        self.ctx.gl().uniform_matrix_3_f32_slice(location.as_ref(), transpose, values);
    }

    /// `values` holds one or more 4x4 matrices.
    pub fn set_uniform_mat4(&self, name: &str, values: &[f32], transpose: bool) {
        let location = self.active_uniform_location(name);
        self.ctx.gl().uniform_matrix_4_f32_slice(location.as_ref(), transpose, values);
    }

    pub fn set_uniform_matrix3(&self, name: &str, m: &Matrix3) {
        self.set_uniform_mat3(name, m.as_slice(), false);
    }

    pub fn set_uniform_matrix4(&self, name: &str, m: &Matrix4) {
        self.set_uniform_mat4(name, m.as_slice(), false);
    }

    pub fn set_uniform_vec2(&self, name: &str, v: Vector2) {
        self.set_uniform_2fv(name, v.as_slice());
    }

    pub fn set_uniform_vec3(&self, name: &str, v: Vector3) {
        self.set_uniform_3fv(name, v.as_slice());
    }

    pub fn set_uniform_vec4(&self, name: &str, v: Vector4) {
        self.set_uniform_4fv(name, v.as_slice());
    }
}

impl Drop for GlShader {
    fn drop(&mut self) {
        self.stop_using();
        let gl = self.ctx.gl();
        for shader in self.stages.drain(..) {
            gl.delete_shader(shader);
        }
        if let Some(program) = self.program.take() {
            gl.delete_program(program);
        }
    }
}

impl fmt::Debug for GlShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlShader")
            .field("program", &self.program)
            .field("pending_stages", &self.stages.len())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::components::mesh::tests::scratch_dir;
    use crate::engine::rendering::recording_gl::{Call, RecordingGl, COMPILE_ERROR_LOG, LINK_ERROR_LOG};

    const VS: &str = "#version 330 core\nlayout(location = 0) in vec3 position;\nvoid main() { gl_Position = vec4(position, 1.0); }\n";
    const FS: &str = "#version 330 core\nout vec4 color;\nvoid main() { color = vec4(1.0); }\n";

    fn linked(gl: &RecordingGl) -> GlShader {
        let mut shader = GlShader::new(&gl.context());
        shader.add_source(VS, ShaderStage::Vertex).unwrap();
        shader.add_source(FS, ShaderStage::Fragment).unwrap();
        shader.finalize().unwrap();
        shader
    }

    #[test]
    fn compile_failure_reports_log_and_blocks_use() {
        let gl = RecordingGl::new();
        gl.fail_compile_on("oops");
        let mut shader = GlShader::new(&gl.context());
        shader.add_source(VS, ShaderStage::Vertex).unwrap();

        let err = shader.add_source("oops", ShaderStage::Fragment).unwrap_err();
        match err {
            ShaderError::Compile { stage, ref log } => {
                assert_eq!(stage, ShaderStage::Fragment);
                assert_eq!(log, COMPILE_ERROR_LOG);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(shader.state(), ShaderState::Failed);
        assert!(shader.finalize().is_err());
        assert!(matches!(shader.use_program(), Err(ShaderError::NotLinked)));

        drop(shader);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn link_failure_carries_driver_log() {
        let gl = RecordingGl::new();
        gl.fail_link();
        let mut shader = GlShader::new(&gl.context());
        shader.add_source(VS, ShaderStage::Vertex).unwrap();
        let err = shader.finalize().unwrap_err();
        assert!(matches!(err, ShaderError::Link { ref log } if log == LINK_ERROR_LOG));
        assert!(shader.use_program().is_err());
    }

    #[test]
    fn finalize_releases_stage_objects() {
        let gl = RecordingGl::new();
        let shader = linked(&gl);
        assert_eq!(shader.state(), ShaderState::Linked);
        assert_eq!(gl.live_objects(), 1);
        drop(shader);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn linked_program_rejects_new_stages() {
        let gl = RecordingGl::new();
        let mut shader = linked(&gl);
        assert!(matches!(
            shader.add_source(FS, ShaderStage::Fragment),
            Err(ShaderError::InvalidState(ShaderState::Linked))
        ));
        assert_eq!(shader.state(), ShaderState::Linked);
        shader.use_program().unwrap();
        assert!(shader.is_using());
        assert_eq!(gl.live_objects(), 1);
    }

    #[test]
    fn finalize_without_stages_is_rejected() {
        let gl = RecordingGl::new();
        let mut shader = GlShader::new(&gl.context());
        assert!(matches!(shader.finalize(), Err(ShaderError::InvalidState(ShaderState::Uninitialized))));
    }

    #[test]
    fn setters_resolve_uniform_names() {
        let gl = RecordingGl::new();
        let shader = linked(&gl);
        shader.use_program().unwrap();
        assert!(shader.is_using());
        gl.clear_calls();

        shader.set_uniform_1i("texture_material[0].diffuse", 0);
        shader.set_uniform_3f("light", 1.0, 2.0, 3.0);
        shader.set_uniform_matrix4("camera", &Matrix4::identity());
        let calls = gl.calls();
        assert_eq!(
            calls[0],
            Call::UniformI { name: "texture_material[0].diffuse".into(), components: 1, values: vec![0] }
        );
        assert_eq!(calls[1], Call::UniformF { name: "light".into(), components: 3, values: vec![1.0, 2.0, 3.0] });
        assert!(matches!(calls[2], Call::UniformMatrix { ref name, dim: 4, transpose: false, .. } if name == "camera"));

        shader.stop_using();
        assert!(!shader.is_using());
    }

    #[test]
    fn attribute_setter_uses_attribute_location() {
        let gl = RecordingGl::new();
        let shader = linked(&gl);
        shader.use_program().unwrap();
        gl.clear_calls();
        shader.set_attrib_3f("normal", 0.0, 1.0, 0.0);
        shader.set_attrib_2fv("missing", &[1.0, 1.0]);
        assert_eq!(gl.calls(), vec![Call::VertexAttrib { index: 1, values: vec![0.0, 1.0, 0.0] }]);
    }

    #[test]
    #[should_panic(expected = "not in use")]
    fn setter_on_inactive_program_panics() {
        let gl = RecordingGl::new();
        let shader = linked(&gl);
        shader.set_uniform_1f("time", 0.5);
    }

    #[test]
    fn init_reads_stage_files() {
        let dir = scratch_dir("shader");
        std::fs::write(dir.join("basic.vs"), VS).unwrap();
        std::fs::write(dir.join("basic.fs"), FS).unwrap();
        let gl = RecordingGl::new();
        let mut shader = GlShader::new(&gl.context());
        shader.init(&[dir.join("basic.vs"), dir.join("basic.fs")]).unwrap();
        shader.finalize().unwrap();
        shader.use_program().unwrap();
        assert!(shader.is_using());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let gl = RecordingGl::new();
        let mut shader = GlShader::new(&gl.context());
        assert!(matches!(shader.add_file("shader.glsl"), Err(ShaderError::UnknownStage(_))));
    }
}
