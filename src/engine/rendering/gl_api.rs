use glow::HasContext;

/// Subset of the OpenGL API used by the GPU objects in this crate.
///
/// Method names and handle types mirror `glow`. Implementations may assume
/// that the context they wrap is current on the calling thread; that promise
/// is made once, when the implementation is constructed.
pub trait GlApi {
    // Shaders and programs
    fn create_shader(&self, stage: u32) -> Result<glow::Shader, String>;
    fn shader_source(&self, shader: glow::Shader, source: &str);
    fn compile_shader(&self, shader: glow::Shader);
    fn get_shader_compile_status(&self, shader: glow::Shader) -> bool;
    fn get_shader_info_log(&self, shader: glow::Shader) -> String;
    fn delete_shader(&self, shader: glow::Shader);
    fn create_program(&self) -> Result<glow::Program, String>;
    fn attach_shader(&self, program: glow::Program, shader: glow::Shader);
    fn detach_shader(&self, program: glow::Program, shader: glow::Shader);
    fn link_program(&self, program: glow::Program);
    fn get_program_link_status(&self, program: glow::Program) -> bool;
    fn get_program_info_log(&self, program: glow::Program) -> String;
    fn delete_program(&self, program: glow::Program);
    fn use_program(&self, program: Option<glow::Program>);
    fn get_attrib_location(&self, program: glow::Program, name: &str) -> Option<u32>;
    fn get_uniform_location(&self, program: glow::Program, name: &str) -> Option<glow::UniformLocation>;

    // Uniforms (slice forms; count is implied by the slice length)
    fn uniform_1_f32_slice(&self, location: Option<&glow::UniformLocation>, v: &[f32]);
    fn uniform_2_f32_slice(&self, location: Option<&glow::UniformLocation>, v: &[f32]);
    fn uniform_3_f32_slice(&self, location: Option<&glow::UniformLocation>, v: &[f32]);
    fn uniform_4_f32_slice(&self, location: Option<&glow::UniformLocation>, v: &[f32]);
    fn uniform_1_i32_slice(&self, location: Option<&glow::UniformLocation>, v: &[i32]);
    fn uniform_2_i32_slice(&self, location: Option<&glow::UniformLocation>, v: &[i32]);
    fn uniform_3_i32_slice(&self, location: Option<&glow::UniformLocation>, v: &[i32]);
    fn uniform_4_i32_slice(&self, location: Option<&glow::UniformLocation>, v: &[i32]);
    fn uniform_1_u32_slice(&self, location: Option<&glow::UniformLocation>, v: &[u32]);
    fn uniform_2_u32_slice(&self, location: Option<&glow::UniformLocation>, v: &[u32]);
    fn uniform_3_u32_slice(&self, location: Option<&glow::UniformLocation>, v: &[u32]);
    fn uniform_4_u32_slice(&self, location: Option<&glow::UniformLocation>, v: &[u32]);
    fn uniform_matrix_3_f32_slice(&self, location: Option<&glow::UniformLocation>, transpose: bool, v: &[f32]);
    fn uniform_matrix_4_f32_slice(&self, location: Option<&glow::UniformLocation>, transpose: bool, v: &[f32]);

    // Generic vertex attributes
    fn vertex_attrib_1_f32_slice(&self, index: u32, v: &[f32]);
    fn vertex_attrib_2_f32_slice(&self, index: u32, v: &[f32]);
    fn vertex_attrib_3_f32_slice(&self, index: u32, v: &[f32]);
    fn vertex_attrib_4_f32_slice(&self, index: u32, v: &[f32]);

    // Textures
    fn create_texture(&self) -> Result<glow::Texture, String>;
    fn delete_texture(&self, texture: glow::Texture);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: u32, texture: Option<glow::Texture>);
    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32);
    fn pixel_store_i32(&self, parameter: u32, value: i32);
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );

    // Buffers and vertex arrays
    fn create_vertex_array(&self) -> Result<glow::VertexArray, String>;
    fn delete_vertex_array(&self, vao: glow::VertexArray);
    fn bind_vertex_array(&self, vao: Option<glow::VertexArray>);
    fn create_buffer(&self) -> Result<glow::Buffer, String>;
    fn delete_buffer(&self, buffer: glow::Buffer);
    fn bind_buffer(&self, target: u32, buffer: Option<glow::Buffer>);
    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], usage: u32);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32);

    // Drawing and state
    fn draw_elements(&self, mode: u32, count: i32, ty: u32, offset: i32);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);
    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: u32);
    fn enable(&self, capability: u32);
    fn get_error(&self) -> u32;
}

/// `GlApi` over a real `glow::Context`.
pub struct GlowBackend {
    gl: glow::Context,
}

impl GlowBackend {
    /// # Safety
    /// The OpenGL context `gl` was loaded from must stay current on this
    /// thread for as long as the backend is used.
    pub unsafe fn new(gl: glow::Context) -> Self {
        Self { gl }
    }
}

macro_rules! forward {
    ($($name:ident($($arg:ident: $ty:ty),*) $(-> $ret:ty)?;)*) => {
        $(
            fn $name(&self, $($arg: $ty),*) $(-> $ret)? {
                unsafe { self.gl.$name($($arg),*) }
            }
        )*
    };
}

impl GlApi for GlowBackend {
    forward! {
        create_shader(stage: u32) -> Result<glow::Shader, String>;
        shader_source(shader: glow::Shader, source: &str);
        compile_shader(shader: glow::Shader);
        get_shader_compile_status(shader: glow::Shader) -> bool;
        get_shader_info_log(shader: glow::Shader) -> String;
        delete_shader(shader: glow::Shader);
        create_program() -> Result<glow::Program, String>;
        attach_shader(program: glow::Program, shader: glow::Shader);
        detach_shader(program: glow::Program, shader: glow::Shader);
        link_program(program: glow::Program);
        get_program_link_status(program: glow::Program) -> bool;
        get_program_info_log(program: glow::Program) -> String;
        delete_program(program: glow::Program);
        use_program(program: Option<glow::Program>);
        get_attrib_location(program: glow::Program, name: &str) -> Option<u32>;
        get_uniform_location(program: glow::Program, name: &str) -> Option<glow::UniformLocation>;

        uniform_1_f32_slice(location: Option<&glow::UniformLocation>, v: &[f32]);
        uniform_2_f32_slice(location: Option<&glow::UniformLocation>, v: &[f32]);
        uniform_3_f32_slice(location: Option<&glow::UniformLocation>, v: &[f32]);
        uniform_4_f32_slice(location: Option<&glow::UniformLocation>, v: &[f32]);
        uniform_1_i32_slice(location: Option<&glow::UniformLocation>, v: &[i32]);
        uniform_2_i32_slice(location: Option<&glow::UniformLocation>, v: &[i32]);
        uniform_3_i32_slice(location: Option<&glow::UniformLocation>, v: &[i32]);
        uniform_4_i32_slice(location: Option<&glow::UniformLocation>, v: &[i32]);
        uniform_1_u32_slice(location: Option<&glow::UniformLocation>, v: &[u32]);
        uniform_2_u32_slice(location: Option<&glow::UniformLocation>, v: &[u32]);
        uniform_3_u32_slice(location: Option<&glow::UniformLocation>, v: &[u32]);
        uniform_4_u32_slice(location: Option<&glow::UniformLocation>, v: &[u32]);
        uniform_matrix_3_f32_slice(location: Option<&glow::UniformLocation>, transpose: bool, v: &[f32]);
        uniform_matrix_4_f32_slice(location: Option<&glow::UniformLocation>, transpose: bool, v: &[f32]);

        vertex_attrib_1_f32_slice(index: u32, v: &[f32]);
        vertex_attrib_2_f32_slice(index: u32, v: &[f32]);
        vertex_attrib_3_f32_slice(index: u32, v: &[f32]);
        vertex_attrib_4_f32_slice(index: u32, v: &[f32]);

        create_texture() -> Result<glow::Texture, String>;
        delete_texture(texture: glow::Texture);
        active_texture(unit: u32);
        bind_texture(target: u32, texture: Option<glow::Texture>);
        tex_parameter_i32(target: u32, parameter: u32, value: i32);
        pixel_store_i32(parameter: u32, value: i32);

        create_vertex_array() -> Result<glow::VertexArray, String>;
        delete_vertex_array(vao: glow::VertexArray);
        bind_vertex_array(vao: Option<glow::VertexArray>);
        create_buffer() -> Result<glow::Buffer, String>;
        delete_buffer(buffer: glow::Buffer);
        bind_buffer(target: u32, buffer: Option<glow::Buffer>);
        buffer_data_u8_slice(target: u32, data: &[u8], usage: u32);
        enable_vertex_attrib_array(index: u32);
        vertex_attrib_pointer_f32(index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32);

        draw_elements(mode: u32, count: i32, ty: u32, offset: i32);
        viewport(x: i32, y: i32, width: i32, height: i32);
        clear_color(r: f32, g: f32, b: f32, a: f32);
        clear(mask: u32);
        enable(capability: u32);
        get_error() -> u32;
    }

    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    ) {
        unsafe {
            self.gl.tex_image_2d(
                target,
                level,
                internal_format,
                width,
                height,
                0,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            )
        }
    }
}
