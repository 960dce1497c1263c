use crate::error::Result;
use image::ImageReader;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageShape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

/// Opens an image and reports its pixel layout.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Result<ImageShape>;
}

/// Fully decodes the file with the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelDecoder;

impl ImageDecoder for PixelDecoder {
    fn decode(&self, path: &Path) -> Result<ImageShape> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(ImageShape {
            width: img.width(),
            height: img.height(),
            channels: img.color().channel_count(),
        })
    }
}

/// Reads only the header to get `(width, height)`.
pub fn image_dimensions(path: &Path) -> Result<(u32, u32)> {
    Ok(ImageReader::open(path)?
        .with_guessed_format()?
        .into_dimensions()?)
}
