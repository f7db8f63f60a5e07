//! Transform output.

use std::sync::Arc;

use serde::Serialize;

use super::file::format_bytes;

/// Binary output of a transform plus a suggested file name and summary.
#[derive(Debug, Clone)]
pub struct ResultArtifact {
    pub bytes: Arc<[u8]>,
    pub filename: String,
    pub mime: String,
    pub summary: Vec<String>,
}

impl ResultArtifact {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, mime: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
            mime: mime.into(),
            summary: Vec::new(),
        }
    }

    /// Append a summary line.
    pub fn with_summary(mut self, line: impl Into<String>) -> Self {
        self.summary.push(line.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Size comparison between an input and the produced output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeReport {
    pub original: u64,
    pub output: u64,
}

impl SizeReport {
    pub fn new(original: u64, output: u64) -> Self {
        Self { original, output }
    }

    /// `(original - output) / original * 100`, or 0 for an empty original.
    pub fn reduction_percent(&self) -> f64 {
        if self.original == 0 {
            return 0.0;
        }
        (self.original as f64 - self.output as f64) / self.original as f64 * 100.0
    }

    /// Summary lines in the form shown to the user.
    pub fn lines(&self, output_label: &str) -> Vec<String> {
        vec![
            format!("Original: {}", format_bytes(self.original)),
            format!("{}: {}", output_label, format_bytes(self.output)),
            format!("Reduction: {:.1}%", self.reduction_percent()),
        ]
    }
}
