//! In-memory `GlApi` used by unit tests: hands out fake handles and records calls.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroU32;
use std::rc::Rc;

use super::gl_api::GlApi;
use super::gl_context::GlContext;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    UseProgram(Option<u32>),
    UniformF { name: String, components: usize, values: Vec<f32> },
    UniformI { name: String, components: usize, values: Vec<i32> },
    UniformU { name: String, components: usize, values: Vec<u32> },
    UniformMatrix { name: String, dim: usize, transpose: bool, values: Vec<f32> },
    VertexAttrib { index: u32, values: Vec<f32> },
    ActiveTexture(u32),
    BindTexture(Option<u32>),
    TexParameter { parameter: u32, value: i32 },
    TexImage { width: i32, height: i32, format: u32, bytes: usize },
    BindVertexArray(Option<u32>),
    BindBuffer { target: u32, buffer: Option<u32> },
    BufferData { target: u32, bytes: usize },
    EnableAttrib(u32),
    AttribPointer { index: u32, size: i32 },
    DrawElements { mode: u32, count: i32 },
    Delete(u32),
}

#[derive(Default)]
struct State {
    next_id: u32,
    calls: Vec<Call>,
    live: HashSet<u32>,
    sources: HashMap<u32, String>,
    compiled: HashSet<u32>,
    attached: HashMap<u32, Vec<u32>>,
    linked: HashSet<u32>,
    locations: HashMap<String, u32>,
    location_names: HashMap<u32, String>,
    compile_fail_marker: Option<String>,
    fail_link: bool,
    pending_error: u32,
}

/// Cloneable so a test can keep a handle after giving one to a `GlContext`.
#[derive(Clone, Default)]
pub struct RecordingGl {
    state: Rc<RefCell<State>>,
}

pub const COMPILE_ERROR_LOG: &str = "0:1(1): error: syntax error, unexpected IDENTIFIER";
pub const LINK_ERROR_LOG: &str = "error: vertex shader output `color' not read by fragment shader";

impl RecordingGl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self) -> GlContext {
        GlContext::with_api(self.clone())
    }

    /// Sources containing `marker` fail to compile.
    pub fn fail_compile_on(&self, marker: &str) {
        self.state.borrow_mut().compile_fail_marker = Some(marker.to_string());
    }

    pub fn fail_link(&self) {
        self.state.borrow_mut().fail_link = true;
    }

    /// The next `get_error` call reports `code`.
    pub fn raise_error(&self, code: u32) {
        self.state.borrow_mut().pending_error = code;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    pub fn int_uniforms(&self) -> Vec<(String, i32)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::UniformI { name, values, .. } => values.first().map(|v| (name, *v)),
                _ => None,
            })
            .collect()
    }

    fn alloc(&self) -> NonZeroU32 {
        let mut s = self.state.borrow_mut();
        s.next_id += 1;
        let id = s.next_id;
        s.live.insert(id);
        NonZeroU32::new(id).unwrap_or(NonZeroU32::MIN)
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn delete(&self, id: u32) {
        let mut s = self.state.borrow_mut();
        s.live.remove(&id);
        s.calls.push(Call::Delete(id));
    }

    fn location_name(&self, location: Option<&glow::UniformLocation>) -> String {
        location
            .and_then(|l| self.state.borrow().location_names.get(&l.0).cloned())
            .unwrap_or_default()
    }
}

impl GlApi for RecordingGl {
    fn create_shader(&self, _stage: u32) -> Result<glow::Shader, String> {
        Ok(glow::NativeShader(self.alloc()))
    }

    fn shader_source(&self, shader: glow::Shader, source: &str) {
        self.state.borrow_mut().sources.insert(shader.0.get(), source.to_string());
    }

    fn compile_shader(&self, shader: glow::Shader) {
        let mut s = self.state.borrow_mut();
        let id = shader.0.get();
        let fails = match (&s.compile_fail_marker, s.sources.get(&id)) {
            (Some(marker), Some(src)) => src.contains(marker.as_str()),
            _ => false,
        };
        if !fails {
            s.compiled.insert(id);
        }
    }

    fn get_shader_compile_status(&self, shader: glow::Shader) -> bool {
        self.state.borrow().compiled.contains(&shader.0.get())
    }

    fn get_shader_info_log(&self, shader: glow::Shader) -> String {
        if self.get_shader_compile_status(shader) {
            String::new()
        } else {
            COMPILE_ERROR_LOG.to_string()
        }
    }

    fn delete_shader(&self, shader: glow::Shader) {
        self.delete(shader.0.get());
    }

    fn create_program(&self) -> Result<glow::Program, String> {
        Ok(glow::NativeProgram(self.alloc()))
    }

    fn attach_shader(&self, program: glow::Program, shader: glow::Shader) {
        self.state.borrow_mut().attached.entry(program.0.get()).or_default().push(shader.0.get());
    }

    fn detach_shader(&self, program: glow::Program, shader: glow::Shader) {
        if let Some(list) = self.state.borrow_mut().attached.get_mut(&program.0.get()) {
            list.retain(|s| *s != shader.0.get());
        }
    }

    fn link_program(&self, program: glow::Program) {
        let mut s = self.state.borrow_mut();
        if !s.fail_link && s.attached.get(&program.0.get()).is_some_and(|a| !a.is_empty()) {
            s.linked.insert(program.0.get());
        }
    }

    fn get_program_link_status(&self, program: glow::Program) -> bool {
        self.state.borrow().linked.contains(&program.0.get())
    }

    fn get_program_info_log(&self, program: glow::Program) -> String {
        if self.get_program_link_status(program) {
            String::new()
        } else {
            LINK_ERROR_LOG.to_string()
        }
    }

    fn delete_program(&self, program: glow::Program) {
        self.delete(program.0.get());
    }

    fn use_program(&self, program: Option<glow::Program>) {
        self.record(Call::UseProgram(program.map(|p| p.0.get())));
    }

    fn get_attrib_location(&self, _program: glow::Program, name: &str) -> Option<u32> {
        match name {
            "position" => Some(0),
            "normal" => Some(1),
            "tex_coord" => Some(2),
            _ => None,
        }
    }

    fn get_uniform_location(&self, _program: glow::Program, name: &str) -> Option<glow::UniformLocation> {
        let mut s = self.state.borrow_mut();
        let next = s.locations.len() as u32;
        let loc = *s.locations.entry(name.to_string()).or_insert(next);
        s.location_names.insert(loc, name.to_string());
        Some(glow::NativeUniformLocation(loc))
    }

    fn uniform_1_f32_slice(&self, location: Option<&glow::UniformLocation>, v: &[f32]) {
        self.record(Call::UniformF { name: self.location_name(location), components: 1, values: v.to_vec() });
    }

    fn uniform_2_f32_slice(&self, location: Option<&glow::UniformLocation>, v: &[f32]) {
        self.record(Call::UniformF { name: self.location_name(location), components: 2, values: v.to_vec() });
    }

    fn uniform_3_f32_slice(&self, location: Option<&glow::UniformLocation>, v: &[f32]) {
        self.record(Call::UniformF { name: self.location_name(location), components: 3, values: v.to_vec() });
    }

    fn uniform_4_f32_slice(&self, location: Option<&glow::UniformLocation>, v: &[f32]) {
        self.record(Call::UniformF { name: self.location_name(location), components: 4, values: v.to_vec() });
    }

    fn uniform_1_i32_slice(&self, location: Option<&glow::UniformLocation>, v: &[i32]) {
        self.record(Call::UniformI { name: self.location_name(location), components: 1, values: v.to_vec() });
    }

    fn uniform_2_i32_slice(&self, location: Option<&glow::UniformLocation>, v: &[i32]) {
        self.record(Call::UniformI { name: self.location_name(location), components: 2, values: v.to_vec() });
    }

    fn uniform_3_i32_slice(&self, location: Option<&glow::UniformLocation>, v: &[i32]) {
        self.record(Call::UniformI { name: self.location_name(location), components: 3, values: v.to_vec() });
    }

    fn uniform_4_i32_slice(&self, location: Option<&glow::UniformLocation>, v: &[i32]) {
        self.record(Call::UniformI { name: self.location_name(location), components: 4, values: v.to_vec() });
    }

    fn uniform_1_u32_slice(&self, location: Option<&glow::UniformLocation>, v: &[u32]) {
        self.record(Call::UniformU { name: self.location_name(location), components: 1, values: v.to_vec() });
    }

    fn uniform_2_u32_slice(&self, location: Option<&glow::UniformLocation>, v: &[u32]) {
        self.record(Call::UniformU { name: self.location_name(location), components: 2, values: v.to_vec() });
    }

    fn uniform_3_u32_slice(&self, location: Option<&glow::UniformLocation>, v: &[u32]) {
        self.record(Call::UniformU { name: self.location_name(location), components: 3, values: v.to_vec() });
    }

    fn uniform_4_u32_slice(&self, location: Option<&glow::UniformLocation>, v: &[u32]) {
        self.record(Call::UniformU { name: self.location_name(location), components: 4, values: v.to_vec() });
    }

    fn uniform_matrix_3_f32_slice(&self, location: Option<&glow::UniformLocation>, transpose: bool, v: &[f32]) {
        self.record(Call::UniformMatrix { name: self.location_name(location), dim: 3, transpose, values: v.to_vec() });
    }

    fn uniform_matrix_4_f32_slice(&self, location: Option<&glow::UniformLocation>, transpose: bool, v: &[f32]) {
        self.record(Call::UniformMatrix { name: self.location_name(location), dim: 4, transpose, values: v.to_vec() });
    }

    fn vertex_attrib_1_f32_slice(&self, index: u32, v: &[f32]) {
        self.record(Call::VertexAttrib { index, values: v.to_vec() });
    }

    fn vertex_attrib_2_f32_slice(&self, index: u32, v: &[f32]) {
        self.record(Call::VertexAttrib { index, values: v.to_vec() });
    }

    fn vertex_attrib_3_f32_slice(&self, index: u32, v: &[f32]) {
        self.record(Call::VertexAttrib { index, values: v.to_vec() });
    }

    fn vertex_attrib_4_f32_slice(&self, index: u32, v: &[f32]) {
        self.record(Call::VertexAttrib { index, values: v.to_vec() });
    }

    fn create_texture(&self) -> Result<glow::Texture, String> {
        Ok(glow::NativeTexture(self.alloc()))
    }

    fn delete_texture(&self, texture: glow::Texture) {
        self.delete(texture.0.get());
    }

    fn active_texture(&self, unit: u32) {
        self.record(Call::ActiveTexture(unit));
    }

    fn bind_texture(&self, _target: u32, texture: Option<glow::Texture>) {
        self.record(Call::BindTexture(texture.map(|t| t.0.get())));
    }

    fn tex_parameter_i32(&self, _target: u32, parameter: u32, value: i32) {
        self.record(Call::TexParameter { parameter, value });
    }

    fn pixel_store_i32(&self, _parameter: u32, _value: i32) {}

    fn tex_image_2d(
        &self,
        _target: u32,
        _level: i32,
        _internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        _ty: u32,
        pixels: Option<&[u8]>,
    ) {
        let bytes = pixels.map_or(0, |p| p.len());
        self.record(Call::TexImage { width, height, format, bytes });
    }

    fn create_vertex_array(&self) -> Result<glow::VertexArray, String> {
        Ok(glow::NativeVertexArray(self.alloc()))
    }

    fn delete_vertex_array(&self, vao: glow::VertexArray) {
        self.delete(vao.0.get());
    }

    fn bind_vertex_array(&self, vao: Option<glow::VertexArray>) {
        self.record(Call::BindVertexArray(vao.map(|v| v.0.get())));
    }

    fn create_buffer(&self) -> Result<glow::Buffer, String> {
        Ok(glow::NativeBuffer(self.alloc()))
    }

    fn delete_buffer(&self, buffer: glow::Buffer) {
        self.delete(buffer.0.get());
    }

    fn bind_buffer(&self, target: u32, buffer: Option<glow::Buffer>) {
        self.record(Call::BindBuffer { target, buffer: buffer.map(|b| b.0.get()) });
    }

    fn buffer_data_u8_slice(&self, target: u32, data: &[u8], _usage: u32) {
        self.record(Call::BufferData { target, bytes: data.len() });
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        self.record(Call::EnableAttrib(index));
    }

    fn vertex_attrib_pointer_f32(&self, index: u32, size: i32, _ty: u32, _normalized: bool, _stride: i32, _offset: i32) {
        self.record(Call::AttribPointer { index, size });
    }

    fn draw_elements(&self, mode: u32, count: i32, _ty: u32, _offset: i32) {
        self.record(Call::DrawElements { mode, count });
    }

    fn viewport(&self, _x: i32, _y: i32, _width: i32, _height: i32) {}

    fn clear_color(&self, _r: f32, _g: f32, _b: f32, _a: f32) {}

    fn clear(&self, _mask: u32) {}

    fn enable(&self, _capability: u32) {}

    fn get_error(&self) -> u32 {
        std::mem::replace(&mut self.state.borrow_mut().pending_error, glow::NO_ERROR)
    }
}
