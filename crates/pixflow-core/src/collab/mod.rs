//! External collaborators the transforms call into.
//!
//! Each collaborator is a narrow trait so any conforming implementation can be
//! substituted (tests use deterministic fakes). The default implementations
//! are built on `lopdf` and `image`; there is no built-in segmentation service.

mod pdf_builder;
mod pdf_editor;
mod segment;

pub use pdf_builder::LopdfBuilder;
pub use pdf_editor::LopdfEditor;
pub use segment::{SeedRegion, Segmenter};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::Serialize;

use crate::error::TransformError;

/// Result type for collaborator calls.
pub type Result<T> = std::result::Result<T, TransformError>;

/// Where an image lands on a page, in points from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Creates new PDF documents.
pub trait PdfBuilder: Send + Sync {
    fn new_document(&self) -> Box<dyn PdfCanvas>;
}

/// A PDF document under construction.
pub trait PdfCanvas {
    /// Append a page; later images are drawn on it.
    fn add_page(&mut self, width: f32, height: f32);

    /// Draw an encoded image on the last page.
    fn add_image(&mut self, bytes: &[u8], format: ImageFormat, placement: Placement) -> Result<()>;

    fn page_count(&self) -> usize;

    /// Finish the document.
    fn serialize(self: Box<Self>) -> Result<Vec<u8>>;
}

/// Document information fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub title: String,
    pub author: String,
    pub subject: String,
    pub keywords: Vec<String>,
    pub creator: String,
    pub producer: String,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
}

/// Serialization options for [`EditableDocument::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    /// Prune unreferenced objects, drop empty streams, renumber and compress.
    pub optimize: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self { optimize: true }
    }
}

/// A loaded PDF that can be edited and saved.
pub trait EditableDocument {
    fn set_title(&mut self, title: &str) -> Result<()>;
    fn set_author(&mut self, author: &str) -> Result<()>;
    fn set_subject(&mut self, subject: &str) -> Result<()>;
    fn set_keywords(&mut self, keywords: &[String]) -> Result<()>;
    fn set_creator(&mut self, creator: &str) -> Result<()>;
    fn set_producer(&mut self, producer: &str) -> Result<()>;
    fn set_creation_date(&mut self, date: DateTime<Utc>) -> Result<()>;
    fn set_modification_date(&mut self, date: DateTime<Utc>) -> Result<()>;

    fn metadata(&self) -> DocumentMetadata;

    fn page_count(&self) -> usize;

    /// Remove the outline tree; returns whether one was present.
    fn strip_bookmarks(&mut self) -> Result<bool>;

    /// Re-encode embedded JPEG images, keeping whichever stream is smaller.
    /// Returns the number of images replaced.
    fn recompress_images(&mut self, quality: u8) -> Result<usize>;

    fn save(&mut self, options: SaveOptions) -> Result<Vec<u8>>;
}

/// A merged document.
#[derive(Debug, Clone)]
pub struct MergedPdf {
    pub bytes: Vec<u8>,
    pub pages: usize,
}

/// Loads existing PDFs for editing.
pub trait PdfEditor: Send + Sync {
    fn load(&self, bytes: &[u8]) -> Result<Box<dyn EditableDocument>>;

    /// Concatenate documents in order.
    fn merge(&self, documents: &[&[u8]]) -> Result<MergedPdf>;
}

/// The set of collaborators handed to the built-in tools.
#[derive(Clone)]
pub struct Collaborators {
    pub pdf_builder: Arc<dyn PdfBuilder>,
    pub pdf_editor: Arc<dyn PdfEditor>,
    pub segmenter: Option<Arc<dyn Segmenter>>,
}

impl Collaborators {
    /// `lopdf`-backed builder and editor, no segmentation service.
    pub fn new(jpeg_quality: u8) -> Self {
        Self {
            pdf_builder: Arc::new(LopdfBuilder::new(jpeg_quality)),
            pdf_editor: Arc::new(LopdfEditor::new()),
            segmenter: None,
        }
    }

    pub fn with_pdf_builder(mut self, builder: Arc<dyn PdfBuilder>) -> Self {
        self.pdf_builder = builder;
        self
    }

    pub fn with_pdf_editor(mut self, editor: Arc<dyn PdfEditor>) -> Self {
        self.pdf_editor = editor;
        self
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = Some(segmenter);
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new(92)
    }
}

pub(crate) fn pdf_error(err: impl std::fmt::Display) -> TransformError {
    TransformError::Pdf(err.to_string())
}
