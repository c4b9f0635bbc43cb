//! CPU-side image data for texture uploads
//!
//! Decoding goes through the `image` crate; pixels are kept as tightly packed
//! 8-bit RGB or RGBA rows.

use std::path::Path;

use crate::gl::TextureFormat;
use crate::render::{RenderError, RenderResult};

/// Channel layout of an [`Image`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// 8-bit red, green, blue
    Rgb,
    /// 8-bit red, green, blue, alpha
    Rgba,
}

impl ImageFormat {
    /// Bytes per pixel
    pub const fn channels(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    /// Matching unsigned-byte texture format
    pub const fn texture_format(self) -> TextureFormat {
        match self {
            Self::Rgb => TextureFormat::RGB8,
            Self::Rgba => TextureFormat::RGBA8,
        }
    }
}

/// Decoded image
#[derive(Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    format: ImageFormat,
    data: Vec<u8>,
}

impl Image {
    /// Wrap raw pixels, checking the length against the dimensions
    pub fn new(width: u32, height: u32, format: ImageFormat, data: Vec<u8>) -> RenderResult<Self> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(RenderError::InvalidInput(format!(
                "{width}x{height} {format:?} image needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Single-color RGBA image
    pub fn solid(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        Self {
            width,
            height,
            format: ImageFormat::Rgba,
            data: color.repeat(pixel_count),
        }
    }

    /// Decode an image file
    pub fn open(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let decoded = image::open(path)
            .map_err(|e| RenderError::InvalidInput(format!("Failed to load image {}: {e}", path.display())))?;
        let image = Self::from_dynamic(decoded);
        log::debug!("Loaded image {}x{} from {}", image.width, image.height, path.display());
        Ok(image)
    }

    /// Decode an in-memory encoded image
    pub fn from_bytes(bytes: &[u8]) -> RenderResult<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| RenderError::InvalidInput(format!("Failed to load image from bytes: {e}")))?;
        Ok(Self::from_dynamic(decoded))
    }

    fn from_dynamic(decoded: image::DynamicImage) -> Self {
        if decoded.color().has_alpha() {
            let rgba = decoded.to_rgba8();
            let (width, height) = rgba.dimensions();
            Self {
                width,
                height,
                format: ImageFormat::Rgba,
                data: rgba.into_raw(),
            }
        } else {
            let rgb = decoded.to_rgb8();
            let (width, height) = rgb.dimensions();
            Self {
                width,
                height,
                format: ImageFormat::Rgb,
                data: rgb.into_raw(),
            }
        }
    }

    /// Average of the red, green and blue channels of every pixel
    pub(crate) fn luminance(&self) -> impl Iterator<Item = u8> + '_ {
        self.data.chunks_exact(self.format.channels()).map(|pixel| {
            let sum = u16::from(pixel[0]) + u16::from(pixel[1]) + u16::from(pixel[2]);
            (sum / 3) as u8
        })
    }

    /// Width in pixels
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Channel layout
    pub const fn format(&self) -> ImageFormat {
        self.format
    }

    /// Packed pixel rows
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_image() {
        let image = Image::solid(4, 2, [255, 0, 0, 255]);
        assert_eq!(image.data().len(), 4 * 2 * 4);
        assert_eq!(&image.data()[0..4], &[255, 0, 0, 255]);
        assert_eq!(image.format(), ImageFormat::Rgba);
    }

    #[test]
    fn test_length_is_validated() {
        assert!(Image::new(2, 2, ImageFormat::Rgb, vec![0; 12]).is_ok());
        assert!(matches!(
            Image::new(2, 2, ImageFormat::Rgba, vec![0; 12]),
            Err(RenderError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_luminance_averages_color_channels() {
        let image = Image::new(2, 1, ImageFormat::Rgb, vec![30, 60, 90, 255, 255, 254]).unwrap();
        let values: Vec<u8> = image.luminance().collect();
        assert_eq!(values, vec![60, 254]);
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(matches!(Image::from_bytes(b"not a png"), Err(RenderError::InvalidInput(_))));
    }
}
