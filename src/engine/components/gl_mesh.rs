use std::fmt;
use std::rc::Rc;

use bytemuck::Pod;

use crate::engine::components::mesh::Mesh;
use crate::engine::components::shader::GlShader;
use crate::engine::components::texture::{GlTexture, TextureType};
use crate::engine::rendering::{GlContext, GlError};

#[derive(Debug)]
pub enum GlMeshError {
    Create(String),
    Gl(GlError),
}

impl fmt::Display for GlMeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GlMeshError::Create(msg) => write!(f, "Failed to create GPU buffers: {}", msg),
            GlMeshError::Gl(err) => write!(f, "OpenGL error during mesh upload: {}", err),
        }
    }
}

impl std::error::Error for GlMeshError {}

/// Buffer slots; the first five double as vertex attribute locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSlot {
    Vertex = 0,
    Normal = 1,
    TexCoord = 2,
    Color = 3,
    Tangent = 4,
    Triangle = 5,
}

const SLOT_COUNT: usize = 6;

struct GpuBuffers {
    vao: glow::VertexArray,
    buffers: [Option<glow::Buffer>; SLOT_COUNT],
}

/// A `Mesh` plus its vertex array object and buffers.
pub struct GlMesh {
    mesh: Mesh,
    ctx: GlContext,
    gpu: Option<GpuBuffers>,
    textures: Vec<Rc<GlTexture>>,
}

impl GlMesh {
    pub fn new(ctx: &GlContext, mesh: Mesh) -> Self {
        Self {
            mesh,
            ctx: ctx.clone(),
            gpu: None,
            textures: Vec::new(),
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn textures(&self) -> &[Rc<GlTexture>] {
        &self.textures
    }

    pub fn add_texture(&mut self, texture: Rc<GlTexture>) {
        self.textures.push(texture);
    }

    pub fn set_textures(&mut self, textures: Vec<Rc<GlTexture>>) {
        self.textures = textures;
    }

    pub fn is_initialized(&self) -> bool {
        self.gpu.is_some()
    }

    pub fn buffer(&self, slot: BufferSlot) -> Option<glow::Buffer> {
        self.gpu.as_ref().and_then(|g| g.buffers[slot as usize])
    }

    /// Uploads every non-empty attribute array. Once an upload succeeds, later
    /// calls are no-ops.
    pub fn init_gl_context(&mut self) -> Result<(), GlMeshError> {
        if self.gpu.is_some() {
            return Ok(());
        }
        let gl = self.ctx.gl();
        let vao = gl.create_vertex_array().map_err(GlMeshError::Create)?;
        let mut gpu = GpuBuffers { vao, buffers: [None; SLOT_COUNT] };
        gl.bind_vertex_array(Some(vao));

        let result = self.upload_all(&mut gpu);
        gl.bind_vertex_array(None);
        gl.bind_buffer(glow::ARRAY_BUFFER, None);
        // The element buffer binding belongs to the VAO and is kept.

        if let Err(err) = result.and_then(|()| self.ctx.check_error().map_err(GlMeshError::Gl)) {
            // A failed upload leaves nothing behind, so a later call starts over.
            self.release(gpu);
            return Err(err);
        }
        self.gpu = Some(gpu);
        log::debug!(
            "Uploaded mesh: {} vertices, {} triangles",
            self.mesh.vertex_count(),
            self.mesh.triangle_count()
        );
        Ok(())
    }

    fn release(&self, gpu: GpuBuffers) {
        let gl = self.ctx.gl();
        for buffer in gpu.buffers.into_iter().flatten() {
            gl.delete_buffer(buffer);
        }
        gl.delete_vertex_array(gpu.vao);
    }

    fn upload_all(&self, gpu: &mut GpuBuffers) -> Result<(), GlMeshError> {
        let m = &self.mesh;
        self.upload_attribute(gpu, BufferSlot::Vertex, &m.vertex, 3)?;
        self.upload_attribute(gpu, BufferSlot::Normal, &m.normal, 3)?;
        self.upload_attribute(gpu, BufferSlot::TexCoord, &m.tex_coord, 2)?;
        self.upload_attribute(gpu, BufferSlot::Color, &m.vertex_color, 3)?;
        self.upload_attribute(gpu, BufferSlot::Tangent, &m.tangent, 3)?;

        if !m.triangle.is_empty() {
            let gl = self.ctx.gl();
            let ebo = gl.create_buffer().map_err(GlMeshError::Create)?;
            gpu.buffers[BufferSlot::Triangle as usize] = Some(ebo);
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(glow::ELEMENT_ARRAY_BUFFER, bytemuck::cast_slice(&m.triangle), glow::STATIC_DRAW);
        }
        Ok(())
    }

    fn upload_attribute<T: Pod>(
        &self,
        gpu: &mut GpuBuffers,
        slot: BufferSlot,
        data: &[T],
        components: i32,
    ) -> Result<(), GlMeshError> {
        if data.is_empty() {
            return Ok(());
        }
        let gl = self.ctx.gl();
        let buffer = gl.create_buffer().map_err(GlMeshError::Create)?;
        gpu.buffers[slot as usize] = Some(buffer);
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
        gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, bytemuck::cast_slice(data), glow::STATIC_DRAW);
        gl.enable_vertex_attrib_array(slot as u32);
        gl.vertex_attrib_pointer_f32(slot as u32, components, glow::FLOAT, false, 0, 0);
        Ok(())
    }

    pub fn bind(&self) {
        if let Some(gpu) = &self.gpu {
            self.ctx.gl().bind_vertex_array(Some(gpu.vao));
        }
    }

    pub fn unbind(&self) {
        self.ctx.gl().bind_vertex_array(None);
    }

    /// Binds textures to consecutive units, points `texture_material[N].<type>` at
    /// them and issues one indexed draw. `shader` must be in use.
    pub fn render(&self, shader: &GlShader) {
        if self.gpu.is_none() || self.mesh.triangle.is_empty() {
            return;
        }
        let mut per_type = [0usize; 3];
        for (unit, texture) in self.textures.iter().enumerate() {
            let ty = texture.texture_type();
            let slot = TextureType::ALL.iter().position(|t| *t == ty).unwrap_or(0);
            let index = per_type[slot];
            per_type[slot] += 1;

            texture.bind(unit as u32);
            shader.set_uniform_1i(&format!("texture_material[{}].{}", index, ty.as_str()), unit as i32);
        }

        self.bind();
        self.ctx
            .gl()
            .draw_elements(glow::TRIANGLES, (self.mesh.triangle.len() * 3) as i32, glow::UNSIGNED_INT, 0);
        self.unbind();

        for (unit, texture) in self.textures.iter().enumerate() {
            texture.unbind(unit as u32);
        }
    }
}

impl Drop for GlMesh {
    fn drop(&mut self) {
        if let Some(gpu) = self.gpu.take() {
            self.release(gpu);
        }
    }
}

impl fmt::Debug for GlMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlMesh")
            .field("vertices", &self.mesh.vertex_count())
            .field("triangles", &self.mesh.triangle_count())
            .field("textures", &self.textures.len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::components::mesh::tests::cube;
    use crate::engine::components::shader::ShaderStage;
    use crate::engine::components::texture::{InterpolationMode, WrappingMode};
    use crate::engine::loaders::image_loader::{Image, PixelFormat};
    use crate::engine::rendering::recording_gl::{Call, RecordingGl};

    fn shader(gl: &RecordingGl) -> GlShader {
        let mut shader = GlShader::new(&gl.context());
        shader.add_source("void main() {}", ShaderStage::Vertex).unwrap();
        shader.add_source("void main() {}", ShaderStage::Fragment).unwrap();
        shader.finalize().unwrap();
        shader
    }

    fn texture(gl: &RecordingGl, ty: TextureType) -> Rc<GlTexture> {
        let image = Image::new(PixelFormat::Rgba, 1, 1, vec![0, 0, 255, 255]).unwrap();
        Rc::new(GlTexture::from_image(&gl.context(), &image, ty, WrappingMode::Repeat, InterpolationMode::Linear).unwrap())
    }

    #[test]
    fn uploads_only_present_attributes() {
        let gl = RecordingGl::new();
        let mut mesh = GlMesh::new(&gl.context(), cube());
        mesh.init_gl_context().unwrap();

        assert!(mesh.buffer(BufferSlot::Vertex).is_some());
        assert!(mesh.buffer(BufferSlot::Triangle).is_some());
        assert!(mesh.buffer(BufferSlot::Normal).is_none());
        assert!(mesh.buffer(BufferSlot::TexCoord).is_none());

        let calls = gl.calls();
        assert!(calls.contains(&Call::BufferData { target: glow::ARRAY_BUFFER, bytes: 8 * 12 }));
        assert!(calls.contains(&Call::BufferData { target: glow::ELEMENT_ARRAY_BUFFER, bytes: 12 * 3 * 4 }));
        assert!(calls.contains(&Call::AttribPointer { index: 0, size: 3 }));
        assert!(!calls.contains(&Call::EnableAttrib(1)));
    }

    #[test]
    fn render_sets_texture_slots_and_draws_once() {
        let gl = RecordingGl::new();
        let shader = shader(&gl);
        let mut mesh = GlMesh::new(&gl.context(), cube());
        mesh.init_gl_context().unwrap();
        mesh.set_textures(vec![texture(&gl, TextureType::Diffuse), texture(&gl, TextureType::Normal)]);

        shader.use_program().unwrap();
        gl.clear_calls();
        mesh.render(&shader);

        assert_eq!(
            gl.int_uniforms(),
            vec![("texture_material[0].diffuse".to_string(), 0), ("texture_material[0].normal".to_string(), 1)]
        );
        let draws: Vec<_> = gl.calls().into_iter().filter(|c| matches!(c, Call::DrawElements { .. })).collect();
        assert_eq!(draws, vec![Call::DrawElements { mode: glow::TRIANGLES, count: 36 }]);
        assert_eq!(gl.calls().last(), Some(&Call::BindTexture(None)));
    }

    #[test]
    fn second_texture_of_a_type_gets_next_index() {
        let gl = RecordingGl::new();
        let shader = shader(&gl);
        let mut mesh = GlMesh::new(&gl.context(), cube());
        mesh.init_gl_context().unwrap();
        mesh.add_texture(texture(&gl, TextureType::Specular));
        mesh.add_texture(texture(&gl, TextureType::Specular));
        shader.use_program().unwrap();
        gl.clear_calls();
        mesh.render(&shader);
        assert_eq!(
            gl.int_uniforms(),
            vec![("texture_material[0].specular".to_string(), 0), ("texture_material[1].specular".to_string(), 1)]
        );
    }

    #[test]
    fn uninitialized_mesh_renders_nothing() {
        let gl = RecordingGl::new();
        let shader = shader(&gl);
        let mesh = GlMesh::new(&gl.context(), cube());
        shader.use_program().unwrap();
        gl.clear_calls();
        mesh.render(&shader);
        assert!(gl.calls().is_empty());
    }

    #[test]
    fn gl_error_after_upload_is_reported() {
        let gl = RecordingGl::new();
        let mut mesh = GlMesh::new(&gl.context(), cube());
        gl.raise_error(glow::OUT_OF_MEMORY);
        assert!(matches!(mesh.init_gl_context(), Err(GlMeshError::Gl(_))));
        assert!(!mesh.is_initialized());
        assert!(mesh.buffer(BufferSlot::Vertex).is_none());
        assert_eq!(gl.live_objects(), 0);
        drop(mesh);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn failed_upload_draws_nothing_and_retry_uploads_again() {
        let gl = RecordingGl::new();
        let shader = shader(&gl);
        let mut mesh = GlMesh::new(&gl.context(), cube());
        gl.raise_error(glow::OUT_OF_MEMORY);
        assert!(mesh.init_gl_context().is_err());

        shader.use_program().unwrap();
        gl.clear_calls();
        mesh.render(&shader);
        assert!(!gl.calls().iter().any(|c| matches!(c, Call::DrawElements { .. })));

        gl.clear_calls();
        mesh.init_gl_context().unwrap();
        assert!(mesh.is_initialized());
        assert!(gl.calls().contains(&Call::BufferData { target: glow::ARRAY_BUFFER, bytes: 8 * 12 }));

        mesh.render(&shader);
        assert!(gl.calls().contains(&Call::DrawElements { mode: glow::TRIANGLES, count: 36 }));
    }

    #[test]
    fn drop_deletes_buffers_before_vertex_array() {
        let gl = RecordingGl::new();
        let mut mesh = GlMesh::new(&gl.context(), cube());
        mesh.init_gl_context().unwrap();
        gl.clear_calls();
        drop(mesh);
        let deletes: Vec<u32> = gl
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect();
        // vao is created first, so it has the smallest id and must be deleted last.
        assert_eq!(deletes.len(), 3);
        assert_eq!(deletes.last(), deletes.iter().min());
        assert_eq!(gl.live_objects(), 0);
    }
}
