//! Background remover.
//!
//! Two strategies: `segment` asks a segmentation collaborator for a
//! foreground mask, `threshold` treats near-white pixels as background.

use std::sync::Arc;

use image::{DynamicImage, RgbaImage};
use tracing::debug;

use super::{BG_REMOVER, configured, first_image};
use crate::collab::{SeedRegion, Segmenter};
use crate::error::TransformError;
use crate::imaging::{self, OutputFormat};
use crate::models::config::BackgroundConfig;
use crate::models::{FileSet, ParamSpec, ParamValues, ResultArtifact};
use crate::registry::{ToolDescriptor, Transform};

const STRATEGIES: [(&str, &str); 2] = [
    ("segment", "Segmentation"),
    ("threshold", "Brightness threshold"),
];

pub fn descriptor(config: &BackgroundConfig, segmenter: Option<Arc<dyn Segmenter>>) -> ToolDescriptor {
    ToolDescriptor::new(BG_REMOVER, "Background Remover", BackgroundRemover { segmenter })
        .with_description("Make the background of an image transparent")
        .with_param(ParamSpec::choice(
            "strategy",
            "Strategy",
            &STRATEGIES,
            configured(&config.strategy, &STRATEGIES, "threshold"),
        ))
        .with_param(ParamSpec::number("threshold", "Threshold", 0.0, 255.0, f64::from(config.threshold)))
        .accepting("image/*")
}

/// Make every pixel whose R, G and B all exceed `threshold` fully transparent.
pub fn chroma_key(image: &mut RgbaImage, threshold: u8) -> usize {
    let mut cleared = 0;
    for pixel in image.pixels_mut() {
        let [r, g, b, _] = pixel.0;
        if r > threshold && g > threshold && b > threshold {
            pixel.0[3] = 0;
            cleared += 1;
        }
    }
    cleared
}

/// Apply a one-byte-per-pixel foreground mask to the alpha channel.
///
/// Mask value 0 clears the pixel entirely; other values cap its alpha.
pub fn apply_mask(image: &mut RgbaImage, mask: &[u8]) -> Result<(), TransformError> {
    let expected = image.width() as usize * image.height() as usize;
    if mask.len() != expected {
        return Err(TransformError::InvalidInput(format!(
            "mask has {} values, expected {}",
            mask.len(),
            expected
        )));
    }

    for (pixel, &m) in image.pixels_mut().zip(mask) {
        if m == 0 {
            pixel.0 = [0, 0, 0, 0];
        } else {
            pixel.0[3] = pixel.0[3].min(m);
        }
    }
    Ok(())
}

struct BackgroundRemover {
    segmenter: Option<Arc<dyn Segmenter>>,
}

impl Transform for BackgroundRemover {
    fn apply(&self, files: &FileSet, params: &ParamValues) -> Result<ResultArtifact, TransformError> {
        let strategy = params.choice("strategy")?;
        let (image, _) = first_image(files)?;
        let mut rgba = image.to_rgba8();

        match strategy {
            "segment" => {
                let segmenter = self
                    .segmenter
                    .as_ref()
                    .ok_or_else(|| TransformError::Unavailable("segmentation service".to_string()))?;
                let (width, height) = rgba.dimensions();
                let seed = SeedRegion::centered(width, height);
                debug!("Segmenting {}x{} image with seed {:?}", width, height, seed);

                let mask = segmenter.segment(rgba.as_raw(), width, height, seed)?;
                apply_mask(&mut rgba, &mask)?;
            }
            "threshold" => {
                let threshold = params.number("threshold")?.round().clamp(0.0, 255.0) as u8;
                let cleared = chroma_key(&mut rgba, threshold);
                debug!("Cleared {} pixel(s) brighter than {}", cleared, threshold);
            }
            other => {
                return Err(TransformError::InvalidParameter(format!("unknown strategy {}", other)));
            }
        }

        let bytes = imaging::encode(&DynamicImage::ImageRgba8(rgba), OutputFormat::Png, 100)?;
        Ok(ResultArtifact::new(bytes, "no-background.png", "image/png").with_summary("Background removed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileHandle;
    use image::Rgba;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    #[test]
    fn test_chroma_key_white_and_black() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        image.put_pixel(1, 0, Rgba([0, 0, 0, 255]));

        assert_eq!(chroma_key(&mut image, 240), 1);
        assert_eq!(image.get_pixel(0, 0).0[3], 0);
        assert_eq!(image.get_pixel(1, 0).0[3], 255);
    }

    #[test]
    fn test_chroma_key_is_strict() {
        let mut image = RgbaImage::from_pixel(1, 1, Rgba([240, 250, 250, 200]));
        assert_eq!(chroma_key(&mut image, 240), 0);
        assert_eq!(image.get_pixel(0, 0).0, [240, 250, 250, 200]);
    }

    #[test]
    fn test_apply_mask() {
        let mut image = RgbaImage::from_pixel(3, 1, Rgba([10, 20, 30, 200]));
        apply_mask(&mut image, &[0, 100, 255]).unwrap();

        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [10, 20, 30, 100]);
        assert_eq!(image.get_pixel(2, 0).0, [10, 20, 30, 200]);
    }

    #[test]
    fn test_apply_mask_wrong_length() {
        let mut image = RgbaImage::new(2, 2);
        let err = apply_mask(&mut image, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, TransformError::InvalidInput(_)));
    }

    /// Keeps the left half of the image, remembering the seed it was given.
    #[derive(Default)]
    struct LeftHalf {
        seen: Mutex<Option<SeedRegion>>,
    }

    impl Segmenter for LeftHalf {
        fn segment(&self, rgba: &[u8], width: u32, height: u32, seed: SeedRegion) -> Result<Vec<u8>, TransformError> {
            assert_eq!(rgba.len(), (width * height * 4) as usize);
            *self.seen.lock().unwrap() = Some(seed);
            Ok((0..height)
                .flat_map(|_| (0..width).map(move |x| if x < width / 2 { 255 } else { 0 }))
                .collect())
        }
    }

    fn png_file(width: u32, height: u32) -> FileSet {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255])));
        let bytes = imaging::encode(&image, OutputFormat::Png, 100).unwrap();
        FileSet::new(vec![FileHandle::new("photo.png", "image/png", bytes)])
    }

    #[test]
    fn test_segment_strategy_uses_mask() {
        let segmenter = Arc::new(LeftHalf::default());
        let service: Arc<dyn Segmenter> = segmenter.clone();
        let tool = descriptor(&BackgroundConfig::default(), Some(service));
        let params = tool.defaults().with("strategy", "segment");

        let artifact = tool.transform.apply(&png_file(200, 120), &params).unwrap();
        assert_eq!(artifact.filename, "no-background.png");
        assert_eq!(
            *segmenter.seen.lock().unwrap(),
            Some(SeedRegion { x: 30, y: 30, width: 140, height: 60 })
        );

        let (output, _) = imaging::decode(&artifact.bytes).unwrap();
        let output = output.to_rgba8();
        assert_eq!(output.get_pixel(10, 10).0[3], 255);
        assert_eq!(output.get_pixel(150, 10).0[3], 0);
    }

    #[test]
    fn test_segment_without_service_is_unavailable() {
        let tool = descriptor(&BackgroundConfig::default(), None);
        let params = tool.defaults().with("strategy", "segment");

        let err = tool.transform.apply(&png_file(4, 4), &params).unwrap_err();
        assert!(matches!(err, TransformError::Unavailable(_)));
    }

    #[test]
    fn test_threshold_strategy_by_default() {
        let tool = descriptor(&BackgroundConfig::default(), None);
        let artifact = tool.transform.apply(&png_file(4, 4), &tool.defaults()).unwrap();

        let (output, _) = imaging::decode(&artifact.bytes).unwrap();
        assert!(output.to_rgba8().pixels().all(|p| p.0[3] == 0));
    }
}
