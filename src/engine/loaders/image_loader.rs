use std::fmt;
use std::path::Path;

// ================================================================================================
// ERRORS
// ================================================================================================

#[derive(Debug)]
pub enum ImageError {
    UnsupportedExtension(String),
    Io(std::io::Error),
    Decode(image::ImageError),
    InvalidData(String),
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::UnsupportedExtension(ext) => write!(f, "No image codec registered for '{}'", ext),
            ImageError::Io(err) => write!(f, "IO error: {}", err),
            ImageError::Decode(err) => write!(f, "Image codec error: {}", err),
            ImageError::InvalidData(msg) => write!(f, "Invalid image data: {}", msg),
        }
    }
}

impl std::error::Error for ImageError {}

impl From<std::io::Error> for ImageError {
    fn from(err: std::io::Error) -> Self {
        ImageError::Io(err)
    }
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(io) => ImageError::Io(io),
            other => ImageError::Decode(other),
        }
    }
}

// ================================================================================================
// CODEC TABLE
// ================================================================================================

/// Extension to codec table.
const CODECS: &[(&str, image::ImageFormat)] = &[
    ("png", image::ImageFormat::Png),
    ("jpg", image::ImageFormat::Jpeg),
    ("jpeg", image::ImageFormat::Jpeg),
    ("tga", image::ImageFormat::Tga),
];

pub fn codec_for(path: &Path) -> Result<image::ImageFormat, ImageError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    CODECS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, format)| *format)
        .ok_or(ImageError::UnsupportedExtension(ext))
}

// ================================================================================================
// IMAGE
// ================================================================================================

/// Channel layout; the discriminant is the number of bytes per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Grayscale = 1,
    Rgb = 3,
    Rgba = 4,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        self as usize
    }
}

/// Decoded 8-bit image, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    format: PixelFormat,
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Image {
    pub fn new(format: PixelFormat, width: u32, height: u32, data: Vec<u8>) -> Result<Self, ImageError> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(ImageError::InvalidData(format!(
                "{}x{} {:?} needs {} bytes, got {}",
                width,
                height,
                format,
                expected,
                data.len()
            )));
        }
        Ok(Self { format, width, height, data })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let codec = codec_for(path)?;
        let bytes = std::fs::read(path)?;
        let image = Self::decode(&bytes, codec)?;
        log::debug!("Decoded {} ({}x{} {:?})", path.display(), image.width, image.height, image.format);
        Ok(image)
    }

    /// Decodes an in-memory file (e.g. an image embedded in a model asset).
    pub fn decode(bytes: &[u8], codec: image::ImageFormat) -> Result<Self, ImageError> {
        let decoded = image::load_from_memory_with_format(bytes, codec)?;
        Ok(Self::from_dynamic(decoded))
    }

    /// Like `decode`, guessing the codec from the content.
    pub fn decode_guess(bytes: &[u8]) -> Result<Self, ImageError> {
        Ok(Self::from_dynamic(image::load_from_memory(bytes)?))
    }

    fn from_dynamic(decoded: image::DynamicImage) -> Self {
        let (width, height) = (decoded.width(), decoded.height());
        let color = decoded.color();
        let (format, data) = if !color.has_color() && !color.has_alpha() {
            (PixelFormat::Grayscale, decoded.into_luma8().into_raw())
        } else if color.has_alpha() {
            (PixelFormat::Rgba, decoded.into_rgba8().into_raw())
        } else {
            (PixelFormat::Rgb, decoded.into_rgb8().into_raw())
        };
        Self { format, width, height, data }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ImageError> {
        let path = path.as_ref();
        let codec = codec_for(path)?;
        let color = match self.format {
            PixelFormat::Grayscale => image::ColorType::L8,
            PixelFormat::Rgb => image::ColorType::Rgb8,
            PixelFormat::Rgba => image::ColorType::Rgba8,
        };
        image::save_buffer_with_format(path, &self.data, self.width, self.height, color, codec)?;
        Ok(())
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
