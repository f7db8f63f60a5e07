//! File intake: validates a selection and swaps it in as the new file set.

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PixflowError, Result};
use crate::models::{FileHandle, FileSet, FileSummary, mime_matches};

/// Renderable thumbnail source taken from the first selected image.
#[derive(Debug, Clone, Serialize)]
pub struct Thumbnail {
    pub mime: String,
    #[serde(skip)]
    pub bytes: Arc<[u8]>,
}

/// Lightweight preview of an accepted selection.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub files: Vec<FileSummary>,
    pub thumbnail: Option<Thumbnail>,
}

impl Preview {
    fn of(files: &FileSet) -> Self {
        let thumbnail = files.first().filter(|f| f.is_image()).map(|f| Thumbnail {
            mime: f.mime().to_string(),
            bytes: f.shared_bytes(),
        });

        Self {
            files: files.iter().map(FileSummary::from).collect(),
            thumbnail,
        }
    }
}

/// MIME allowlist declared by the tool a selection is made for.
#[derive(Debug, Clone, Copy)]
pub struct AcceptRule<'a> {
    pub tool_id: &'a str,
    pub accepts: &'a [String],
}

impl AcceptRule<'_> {
    pub fn check(&self, file: &FileHandle) -> Result<()> {
        if self.accepts.is_empty() || self.accepts.iter().any(|p| mime_matches(p, file.mime())) {
            return Ok(());
        }
        Err(PixflowError::UnsupportedFile {
            tool_id: self.tool_id.to_string(),
            file: file.name().to_string(),
            mime: file.mime().to_string(),
        })
    }
}

/// Holds the current file set of a session.
#[derive(Debug, Default)]
pub struct FileIntake {
    current: Mutex<FileSet>,
}

impl FileIntake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the file set with `files`.
    ///
    /// An empty selection is a no-op and returns `None`. When a rule is given,
    /// every file must pass it or nothing is replaced.
    pub fn accept(&self, files: Vec<FileHandle>, rule: Option<AcceptRule<'_>>) -> Result<Option<Preview>> {
        if files.is_empty() {
            debug!("Empty selection ignored");
            return Ok(None);
        }

        if let Some(rule) = rule {
            for file in &files {
                if let Err(e) = rule.check(file) {
                    warn!("Rejected selection: {}", e);
                    return Err(e);
                }
            }
        }

        let set = FileSet::new(files);
        let preview = Preview::of(&set);
        debug!("Accepted {} file(s), {} bytes", set.len(), set.total_size());

        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = set;
        Ok(Some(preview))
    }

    /// Snapshot of the current file set.
    pub fn files(&self) -> FileSet {
        self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Drop the current selection.
    pub fn clear(&self) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = FileSet::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> FileHandle {
        FileHandle::new(name, "image/png", vec![0u8; 4])
    }

    fn pdf(name: &str) -> FileHandle {
        FileHandle::new(name, "application/pdf", vec![0u8; 8])
    }

    #[test]
    fn test_empty_selection_is_noop() {
        let intake = FileIntake::new();
        intake.accept(vec![png("a.png")], None).unwrap();

        assert!(intake.accept(Vec::new(), None).unwrap().is_none());
        assert_eq!(intake.files().len(), 1);
    }

    #[test]
    fn test_preview_thumbnail_from_first_image() {
        let intake = FileIntake::new();
        let preview = intake.accept(vec![png("a.png"), pdf("b.pdf")], None).unwrap().unwrap();

        assert_eq!(preview.files.len(), 2);
        assert_eq!(preview.files[1].size_label, "8 Bytes");
        assert_eq!(preview.thumbnail.unwrap().mime, "image/png");

        let preview = intake.accept(vec![pdf("b.pdf"), png("a.png")], None).unwrap().unwrap();
        assert!(preview.thumbnail.is_none());
    }

    #[test]
    fn test_rejected_selection_keeps_previous_set() {
        let intake = FileIntake::new();
        intake.accept(vec![png("keep.png")], None).unwrap();

        let accepts = vec!["image/*".to_string()];
        let rule = AcceptRule { tool_id: "image-resizer", accepts: &accepts };
        let err = intake.accept(vec![png("a.png"), pdf("b.pdf")], Some(rule)).unwrap_err();

        assert!(matches!(err, PixflowError::UnsupportedFile { ref file, .. } if file == "b.pdf"));
        assert_eq!(intake.files().first().unwrap().name(), "keep.png");
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let intake = FileIntake::new();
        intake.accept(vec![png("old.png")], None).unwrap();
        let snapshot = intake.files();

        intake.accept(vec![png("new1.png"), png("new2.png")], None).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.first().unwrap().name(), "old.png");
        assert_eq!(intake.files().len(), 2);
    }
}
