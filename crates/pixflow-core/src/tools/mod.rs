//! Built-in tool catalog.

pub mod bg_remove;
pub mod image_compress;
pub mod image_to_pdf;
pub mod pdf_compress;
pub mod pdf_merge;
pub mod resize;

use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::collab::Collaborators;
use crate::error::{Result, TransformError};
use crate::imaging;
use crate::models::{FileHandle, FileSet, PixflowConfig};
use crate::registry::ToolRegistry;

pub const IMAGE_TO_PDF: &str = "image-to-pdf";
pub const IMAGE_RESIZER: &str = "image-resizer";
pub const PDF_COMPRESSOR: &str = "pdf-compressor";
pub const BG_REMOVER: &str = "bg-remover";
pub const IMAGE_COMPRESSOR: &str = "image-compressor";
pub const PDF_MERGER: &str = "pdf-merger";

/// Registry with every built-in tool, parameter defaults taken from `config`.
pub fn builtin_registry(config: &PixflowConfig, collab: Collaborators) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(image_to_pdf::descriptor(&config.pdf, collab.pdf_builder.clone()))?;
    registry.register(resize::descriptor(&config.image))?;
    registry.register(image_compress::descriptor(&config.image))?;
    registry.register(pdf_compress::descriptor(collab.pdf_editor.clone()))?;
    registry.register(pdf_merge::descriptor(collab.pdf_editor))?;
    registry.register(bg_remove::descriptor(&config.background, collab.segmenter))?;

    debug!("Built-in catalog has {} tools", registry.len());
    Ok(registry)
}

/// First file of the set; transforms are only invoked with non-empty sets.
pub(crate) fn first_file(files: &FileSet) -> std::result::Result<&FileHandle, TransformError> {
    files
        .first()
        .ok_or_else(|| TransformError::InvalidInput("no files".to_string()))
}

/// Decode the first file of the set as an image.
pub(crate) fn first_image(files: &FileSet) -> std::result::Result<(DynamicImage, ImageFormat), TransformError> {
    let file = first_file(files)?;
    let decoded = imaging::decode(file.bytes())?;
    debug!("Decoded {} as {:?} ({}x{})", file.name(), decoded.1, decoded.0.width(), decoded.0.height());
    Ok(decoded)
}

/// A configured choice default, or `fallback` when the config names an unknown value.
pub(crate) fn configured<'a>(value: &'a str, choices: &[(&str, &str)], fallback: &'a str) -> &'a str {
    if choices.iter().any(|(v, _)| *v == value) {
        value
    } else {
        debug!("Ignoring unknown configured value '{}', using '{}'", value, fallback);
        fallback
    }
}

/// Integer value of a bounded number parameter.
pub(crate) fn quality(value: f64) -> u8 {
    value.round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_order() {
        let registry = builtin_registry(&PixflowConfig::default(), Collaborators::default()).unwrap();
        let ids: Vec<&str> = registry.tools().map(|t| t.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![IMAGE_TO_PDF, IMAGE_RESIZER, IMAGE_COMPRESSOR, PDF_COMPRESSOR, PDF_MERGER, BG_REMOVER]
        );
    }

    #[test]
    fn test_defaults_follow_config() {
        let mut config = PixflowConfig::default();
        config.pdf.page_size = "letter".to_string();
        config.image.quality = 70;
        config.background.threshold = 200;

        let registry = builtin_registry(&config, Collaborators::default()).unwrap();
        assert_eq!(registry.defaults(IMAGE_TO_PDF).unwrap().choice("page_size").unwrap(), "letter");
        assert_eq!(registry.defaults(IMAGE_RESIZER).unwrap().number("quality").unwrap(), 70.0);
        assert_eq!(registry.defaults(BG_REMOVER).unwrap().number("threshold").unwrap(), 200.0);
    }

    #[test]
    fn test_quality_rounding() {
        assert_eq!(quality(74.6), 75);
        assert_eq!(quality(0.0), 1);
        assert_eq!(quality(250.0), 100);
    }
}
