//! PDF merger.

use std::sync::Arc;

use tracing::debug;

use super::PDF_MERGER;
use crate::collab::PdfEditor;
use crate::error::TransformError;
use crate::models::{FileSet, ParamValues, ResultArtifact};
use crate::registry::{ToolDescriptor, Transform};

pub fn descriptor(editor: Arc<dyn PdfEditor>) -> ToolDescriptor {
    ToolDescriptor::new(PDF_MERGER, "PDF Merger", PdfMerger { editor })
        .with_description("Combine PDFs into one document, in the order given")
        .accepting("application/pdf")
}

struct PdfMerger {
    editor: Arc<dyn PdfEditor>,
}

impl Transform for PdfMerger {
    fn apply(&self, files: &FileSet, _params: &ParamValues) -> Result<ResultArtifact, TransformError> {
        let documents: Vec<&[u8]> = files.iter().map(|f| f.bytes()).collect();
        let merged = self.editor.merge(&documents)?;
        debug!("Merged {} file(s), {} bytes in", documents.len(), files.total_size());

        Ok(ResultArtifact::new(merged.bytes, "merged.pdf", "application/pdf").with_summary(format!(
            "Merged {} document(s) into {} page(s)",
            documents.len(),
            merged.pages
        )))
    }
}
