//! Raster encoding helpers shared by the image tools.

use std::fmt;
use std::io::Cursor;
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, GrayImage, ImageError, ImageFormat, ImageReader};
use serde::{Deserialize, Serialize};

/// Raster output formats offered by the image tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpg,
    Png,
    Webp,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Whether the encoder honours a quality setting.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpg)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(Self::Jpg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            other => Err(format!("unsupported output format: {}", other)),
        }
    }
}

/// Encode as baseline JPEG. Transparency is dropped.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(buffer)
}

/// Encode as a single-component grayscale JPEG.
pub fn encode_jpeg_gray(image: &GrayImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100)).encode_image(image)?;
    Ok(buffer)
}

/// Encode in the given format. `quality` only applies to JPEG; WebP is lossless.
pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>, ImageError> {
    match format {
        OutputFormat::Jpg => encode_jpeg(image, quality),
        OutputFormat::Png => {
            let mut buffer = Vec::new();
            image.write_with_encoder(PngEncoder::new(&mut buffer))?;
            Ok(buffer)
        }
        OutputFormat::Webp => {
            let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
            let mut buffer = Vec::new();
            rgba.write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?;
            Ok(buffer)
        }
    }
}

/// Decode a file's bytes, guessing the format from its content.
pub fn decode(bytes: &[u8]) -> Result<(DynamicImage, ImageFormat), ImageError> {
    let format = image::guess_format(bytes)?;
    let image = image::load_from_memory_with_format(bytes, format)?;
    Ok((image, format))
}

/// Pixel dimensions and format, read from the header without decoding pixels.
pub fn dimensions(bytes: &[u8]) -> Result<((u32, u32), ImageFormat), ImageError> {
    let format = image::guess_format(bytes)?;
    let size = ImageReader::with_format(Cursor::new(bytes), format).into_dimensions()?;
    Ok((size, format))
}
