use std::fmt;

use crate::engine::loaders::image_loader::{Image, ImageError, PixelFormat};
use crate::engine::rendering::{GlContext, GlError};

// ================================================================================================
// ERRORS
// ================================================================================================

#[derive(Debug)]
pub enum TextureError {
    Create(String),
    Image(ImageError),
    TooLarge { width: u32, height: u32 },
    Gl(GlError),
}

impl fmt::Display for TextureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextureError::Create(msg) => write!(f, "Failed to create texture: {}", msg),
            TextureError::Image(err) => write!(f, "Failed to load texture image: {}", err),
            TextureError::TooLarge { width, height } => write!(f, "Texture {}x{} is too large", width, height),
            TextureError::Gl(err) => write!(f, "OpenGL error during texture upload: {}", err),
        }
    }
}

impl std::error::Error for TextureError {}

impl From<ImageError> for TextureError {
    fn from(err: ImageError) -> Self {
        TextureError::Image(err)
    }
}

impl From<GlError> for TextureError {
    fn from(err: GlError) -> Self {
        TextureError::Gl(err)
    }
}

// ================================================================================================
// SAMPLING MODES
// ================================================================================================

/// Semantic slot of a texture inside a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    Diffuse,
    Normal,
    Specular,
}

impl TextureType {
    pub const ALL: [TextureType; 3] = [TextureType::Diffuse, TextureType::Normal, TextureType::Specular];

    /// Field name used in the `texture_material[N]` shader struct.
    pub fn as_str(self) -> &'static str {
        match self {
            TextureType::Diffuse => "diffuse",
            TextureType::Normal => "normal",
            TextureType::Specular => "specular",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrappingMode {
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

impl WrappingMode {
    pub fn gl_enum(self) -> u32 {
        match self {
            WrappingMode::Repeat => glow::REPEAT,
            WrappingMode::MirroredRepeat => glow::MIRRORED_REPEAT,
            WrappingMode::ClampToEdge => glow::CLAMP_TO_EDGE,
            WrappingMode::ClampToBorder => glow::CLAMP_TO_BORDER,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    Nearest,
    Linear,
}

impl InterpolationMode {
    pub fn gl_enum(self) -> u32 {
        match self {
            InterpolationMode::Nearest => glow::NEAREST,
            InterpolationMode::Linear => glow::LINEAR,
        }
    }
}

fn gl_format(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::Grayscale => glow::RED,
        PixelFormat::Rgb => glow::RGB,
        PixelFormat::Rgba => glow::RGBA,
    }
}

// ================================================================================================
// TEXTURE
// ================================================================================================

/// One 2D texture object on the GPU. Deleted when dropped.
pub struct GlTexture {
    ctx: GlContext,
    handle: glow::Texture,
    ty: TextureType,
    width: u32,
    height: u32,
    format: Option<PixelFormat>,
}

impl GlTexture {
    pub fn new(ctx: &GlContext) -> Result<Self, TextureError> {
        let handle = ctx.gl().create_texture().map_err(TextureError::Create)?;
        Ok(Self {
            ctx: ctx.clone(),
            handle,
            ty: TextureType::Diffuse,
            width: 0,
            height: 0,
            format: None,
        })
    }

    /// Creates a texture and uploads `image` into it.
    pub fn from_image(
        ctx: &GlContext,
        image: &Image,
        ty: TextureType,
        wrap: WrappingMode,
        interp: InterpolationMode,
    ) -> Result<Self, TextureError> {
        let mut texture = Self::new(ctx)?;
        texture.upload(image, ty, wrap, interp)?;
        Ok(texture)
    }

    pub fn upload(
        &mut self,
        image: &Image,
        ty: TextureType,
        wrap: WrappingMode,
        interp: InterpolationMode,
    ) -> Result<(), TextureError> {
        let (width, height) = (image.width(), image.height());
        let too_large = || TextureError::TooLarge { width, height };
        let w = i32::try_from(width).map_err(|_| too_large())?;
        let h = i32::try_from(height).map_err(|_| too_large())?;
        let format = gl_format(image.format());

        let gl = self.ctx.gl();
        gl.bind_texture(glow::TEXTURE_2D, Some(self.handle));
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap.gl_enum() as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap.gl_enum() as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, interp.gl_enum() as i32);
        gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, interp.gl_enum() as i32);
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.tex_image_2d(
            glow::TEXTURE_2D,
            0,
            format as i32,
            w,
            h,
            format,
            glow::UNSIGNED_BYTE,
            Some(image.data()),
        );
        gl.bind_texture(glow::TEXTURE_2D, None);
        self.ctx.check_error()?;

        self.ty = ty;
        self.width = width;
        self.height = height;
        self.format = Some(image.format());
        Ok(())
    }

    /// Binds to texture unit `unit`.
    pub fn bind(&self, unit: u32) {
        let gl = self.ctx.gl();
        gl.active_texture(glow::TEXTURE0 + unit);
        gl.bind_texture(glow::TEXTURE_2D, Some(self.handle));
    }

    pub fn unbind(&self, unit: u32) {
        let gl = self.ctx.gl();
        gl.active_texture(glow::TEXTURE0 + unit);
        gl.bind_texture(glow::TEXTURE_2D, None);
    }

    pub fn texture_type(&self) -> TextureType {
        self.ty
    }

    pub fn set_texture_type(&mut self, ty: TextureType) {
        self.ty = ty;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> Option<PixelFormat> {
        self.format
    }

    pub fn handle(&self) -> glow::Texture {
        self.handle
    }
}

impl Drop for GlTexture {
    fn drop(&mut self) {
        log::debug!("Deleting texture {:?}", self.handle);
        self.ctx.gl().delete_texture(self.handle);
    }
}

impl fmt::Debug for GlTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlTexture")
            .field("handle", &self.handle)
            .field("type", &self.ty)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
