//! PDF compressor: optional metadata, outline and image stripping, then an optimised save.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::{PDF_COMPRESSOR, first_file, quality};
use crate::collab::{EditableDocument, PdfEditor, SaveOptions};
use crate::error::TransformError;
use crate::models::{FileSet, ParamSpec, ParamValues, ResultArtifact, SizeReport};
use crate::registry::{ToolDescriptor, Transform};

pub fn descriptor(editor: Arc<dyn PdfEditor>) -> ToolDescriptor {
    ToolDescriptor::new(PDF_COMPRESSOR, "PDF Compressor", PdfCompressor { editor })
        .with_description("Reduce PDF file size")
        .with_param(ParamSpec::flag("remove_metadata", "Remove metadata", false))
        .with_param(ParamSpec::flag("remove_bookmarks", "Remove bookmarks", false))
        .with_param(ParamSpec::flag("compress_images", "Compress images", false))
        .with_param(ParamSpec::number("image_quality", "Image Quality", 10.0, 100.0, 75.0))
        .accepting("application/pdf")
}

/// Blank every information field and stamp both dates with the current time.
pub fn strip_metadata(doc: &mut dyn EditableDocument) -> Result<(), TransformError> {
    doc.set_title("")?;
    doc.set_author("")?;
    doc.set_subject("")?;
    doc.set_keywords(&[])?;
    doc.set_producer("")?;
    doc.set_creator("")?;

    let now = Utc::now();
    doc.set_creation_date(now)?;
    doc.set_modification_date(now)?;
    Ok(())
}

struct PdfCompressor {
    editor: Arc<dyn PdfEditor>,
}

impl Transform for PdfCompressor {
    fn apply(&self, files: &FileSet, params: &ParamValues) -> Result<ResultArtifact, TransformError> {
        let remove_metadata = params.flag("remove_metadata")?;
        let remove_bookmarks = params.flag("remove_bookmarks")?;
        let compress_images = params.flag("compress_images")?;
        let image_quality = quality(params.number("image_quality")?);

        let file = first_file(files)?;
        let mut doc = self.editor.load(file.bytes())?;

        if remove_metadata {
            strip_metadata(doc.as_mut())?;
            debug!("Stripped metadata from {}", file.name());
        }
        if remove_bookmarks {
            doc.strip_bookmarks()?;
        }
        if compress_images {
            doc.recompress_images(image_quality)?;
        }

        let bytes = doc.save(SaveOptions { optimize: true })?;
        let report = SizeReport::new(file.size(), bytes.len() as u64);
        debug!("{}: {} -> {} bytes", file.name(), report.original, report.output);

        let mut artifact = ResultArtifact::new(bytes, "compressed.pdf", "application/pdf");
        for line in report.lines("Compressed") {
            artifact = artifact.with_summary(line);
        }
        Ok(artifact)
    }
}
