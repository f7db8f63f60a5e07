//! Image resizer.

use image::GenericImageView;
use image::imageops::FilterType;
use tracing::debug;

use super::{IMAGE_RESIZER, configured, first_image, quality};
use crate::error::TransformError;
use crate::imaging::{self, OutputFormat};
use crate::models::config::ImageConfig;
use crate::models::{FileSet, ParamSpec, ParamValues, ResultArtifact};
use crate::registry::ToolDescriptor;

const MODES: [(&str, &str); 3] = [
    ("percentage", "Percentage"),
    ("dimensions", "Custom Dimensions"),
    ("preset", "Preset Sizes"),
];

const PRESETS: [(&str, &str); 6] = [
    ("instagram", "Instagram Post (1080x1080)"),
    ("facebook", "Facebook Cover (1200x630)"),
    ("twitter", "Twitter Post (1200x675)"),
    ("linkedin", "LinkedIn Post (1200x627)"),
    ("hd", "HD (1280x720)"),
    ("fullhd", "Full HD (1920x1080)"),
];

pub(crate) const FORMATS: [(&str, &str); 3] = [("jpg", "JPG"), ("png", "PNG"), ("webp", "WebP")];

/// How the target size is chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeMode {
    /// Scale both sides by a percentage.
    Percentage(f64),
    /// Explicit size, optionally shrunk to keep the source aspect ratio.
    Dimensions { width: u32, height: u32, maintain_aspect: bool },
    /// Fixed social-media or video size.
    Preset(u32, u32),
}

/// Size of a named preset.
pub fn preset_size(name: &str) -> Option<(u32, u32)> {
    match name {
        "instagram" => Some((1080, 1080)),
        "facebook" => Some((1200, 630)),
        "twitter" => Some((1200, 675)),
        "linkedin" => Some((1200, 627)),
        "hd" => Some((1280, 720)),
        "fullhd" => Some((1920, 1080)),
        _ => None,
    }
}

/// Output size for a `width`×`height` source. Every side is at least 1.
pub fn target_dimensions(width: u32, height: u32, mode: ResizeMode) -> (u32, u32) {
    let (w, h) = match mode {
        ResizeMode::Percentage(scale) => (
            (f64::from(width) * scale / 100.0).round(),
            (f64::from(height) * scale / 100.0).round(),
        ),
        ResizeMode::Dimensions { width: rw, height: rh, maintain_aspect } => {
            let (mut w, mut h) = (f64::from(rw), f64::from(rh));
            if maintain_aspect && width > 0 && height > 0 && rh > 0 {
                let ratio = f64::from(width) / f64::from(height);
                if w / h > ratio {
                    w = h * ratio;
                } else {
                    h = w / ratio;
                }
            }
            (w.round(), h.round())
        }
        ResizeMode::Preset(w, h) => (f64::from(w), f64::from(h)),
    };

    (w.max(1.0) as u32, h.max(1.0) as u32)
}

fn resize_mode(params: &ParamValues) -> Result<ResizeMode, TransformError> {
    match params.choice("mode")? {
        "percentage" => Ok(ResizeMode::Percentage(params.number("scale")?)),
        "dimensions" => Ok(ResizeMode::Dimensions {
            width: params.number("width")?.round() as u32,
            height: params.number("height")?.round() as u32,
            maintain_aspect: params.flag("maintain_aspect")?,
        }),
        "preset" => {
            let name = params.choice("preset")?;
            let (w, h) = preset_size(name)
                .ok_or_else(|| TransformError::InvalidParameter(format!("unknown preset {}", name)))?;
            Ok(ResizeMode::Preset(w, h))
        }
        other => Err(TransformError::InvalidParameter(format!("unknown resize mode {}", other))),
    }
}

pub(crate) fn output_format(params: &ParamValues) -> Result<OutputFormat, TransformError> {
    params
        .choice("format")?
        .parse()
        .map_err(TransformError::InvalidParameter)
}

pub fn descriptor(config: &ImageConfig) -> ToolDescriptor {
    ToolDescriptor::new(IMAGE_RESIZER, "Image Resizer", resize_image)
        .with_description("Resize images by percentage, dimensions or preset")
        .with_param(ParamSpec::choice("mode", "Resize Mode", &MODES, "percentage"))
        .with_param(ParamSpec::number("scale", "Scale (%)", 10.0, 200.0, 100.0))
        .with_param(ParamSpec::number("width", "Width (px)", 10.0, 5000.0, 800.0))
        .with_param(ParamSpec::number("height", "Height (px)", 10.0, 5000.0, 600.0))
        .with_param(ParamSpec::flag("maintain_aspect", "Maintain aspect ratio", false))
        .with_param(ParamSpec::choice("preset", "Preset", &PRESETS, "instagram"))
        .with_param(ParamSpec::choice(
            "format",
            "Output Format",
            &FORMATS,
            configured(&config.format, &FORMATS, "jpg"),
        ))
        .with_param(ParamSpec::number("quality", "Quality", 10.0, 100.0, f64::from(config.quality)))
        .accepting("image/*")
}

fn resize_image(files: &FileSet, params: &ParamValues) -> Result<ResultArtifact, TransformError> {
    let mode = resize_mode(params)?;
    let format = output_format(params)?;
    let quality = quality(params.number("quality")?);

    let (image, _) = first_image(files)?;
    let (width, height) = image.dimensions();
    let (new_width, new_height) = target_dimensions(width, height, mode);
    debug!("Resizing {}x{} -> {}x{} ({:?})", width, height, new_width, new_height, mode);

    let resized = image.resize_exact(new_width, new_height, FilterType::Lanczos3);
    let bytes = imaging::encode(&resized, format, quality)?;

    Ok(
        ResultArtifact::new(bytes, format!("resized.{}", format.extension()), format.mime())
            .with_summary(format!("Resized to {}×{} pixels", new_width, new_height)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileHandle;
    use image::{DynamicImage, Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_percentage_rounds_each_side() {
        assert_eq!(target_dimensions(1000, 500, ResizeMode::Percentage(50.0)), (500, 250));
        assert_eq!(target_dimensions(333, 101, ResizeMode::Percentage(10.0)), (33, 10));
        assert_eq!(target_dimensions(5, 5, ResizeMode::Percentage(10.0)), (1, 1));
        assert_eq!(target_dimensions(640, 480, ResizeMode::Percentage(150.0)), (960, 720));
    }

    #[test]
    fn test_aspect_lock_shrinks_the_wider_side() {
        let mode = ResizeMode::Dimensions { width: 800, height: 600, maintain_aspect: true };
        // 2:1 source, 4:3 request: height follows width.
        assert_eq!(target_dimensions(2000, 1000, mode), (800, 400));
        // 1:2 source: width follows height.
        assert_eq!(target_dimensions(1000, 2000, mode), (300, 600));
    }

    #[test]
    fn test_aspect_lock_preserves_ratio() {
        for (w, h) in [(1920, 1080), (1080, 1920), (4000, 3000), (17, 1003)] {
            let mode = ResizeMode::Dimensions { width: 640, height: 640, maintain_aspect: true };
            let (nw, nh) = target_dimensions(w, h, mode);
            let expected = f64::from(w) / f64::from(h);
            let actual = f64::from(nw) / f64::from(nh);
            // Within one pixel of rounding on the shorter side.
            let tolerance = expected / f64::from(nw.min(nh)) + 1.0 / f64::from(nh);
            assert!((expected - actual).abs() <= tolerance, "{}x{} -> {}x{}", w, h, nw, nh);
            assert!(nw <= 640 && nh <= 640);
        }
    }

    #[test]
    fn test_dimensions_without_lock() {
        let mode = ResizeMode::Dimensions { width: 123, height: 45, maintain_aspect: false };
        assert_eq!(target_dimensions(1000, 1000, mode), (123, 45));
    }

    #[test]
    fn test_presets() {
        assert_eq!(preset_size("linkedin"), Some((1200, 627)));
        assert_eq!(preset_size("fullhd"), Some((1920, 1080)));
        assert_eq!(preset_size("tiktok"), None);
    }

    #[test]
    fn test_resize_transform_output() {
        let source = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 20, Rgb([1, 2, 3])));
        let bytes = imaging::encode(&source, OutputFormat::Png, 90).unwrap();
        let files = FileSet::new(vec![FileHandle::new("in.png", "image/png", bytes)]);

        let params = descriptor(&ImageConfig::default())
            .defaults()
            .with("scale", 50u32)
            .with("format", "png");
        let artifact = resize_image(&files, &params).unwrap();

        assert_eq!(artifact.filename, "resized.png");
        assert_eq!(artifact.mime, "image/png");
        assert_eq!(artifact.summary, vec!["Resized to 20×10 pixels"]);
        let (image, _) = imaging::decode(&artifact.bytes).unwrap();
        assert_eq!(image.dimensions(), (20, 10));
    }
}
