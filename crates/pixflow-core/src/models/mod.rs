//! Data models shared by the pipeline stages.

pub mod artifact;
pub mod config;
pub mod file;
pub mod params;

pub use artifact::{ResultArtifact, SizeReport};
pub use config::{PixflowConfig, Preferences, Theme};
pub use file::{FileHandle, FileSet, FileSummary, format_bytes, mime_from_path, mime_matches};
pub use params::{Choice, ParamKind, ParamSpec, ParamValue, ParamValues};
