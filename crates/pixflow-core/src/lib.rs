//! Core library for the PixFlow file tools.
//!
//! This crate provides:
//! - A tool registry mapping tool ids to parameter schemas and transforms
//! - File intake with per-tool MIME allowlists and previews
//! - A single-flight executor that captures parameters once per run
//! - An output sink handing results out as revocable download URLs
//! - Built-in tools: image to PDF, resizing, compression, PDF merging and background removal

pub mod collab;
pub mod error;
pub mod executor;
pub mod imaging;
pub mod intake;
pub mod models;
pub mod registry;
pub mod session;
pub mod sink;
pub mod tools;

pub use collab::{Collaborators, LopdfBuilder, LopdfEditor, PdfBuilder, PdfEditor, SeedRegion, Segmenter};
pub use error::{PixflowError, Result, SinkError, TransformError};
pub use executor::Executor;
pub use intake::{FileIntake, Preview, Thumbnail};
pub use models::{FileHandle, FileSet, ParamSpec, ParamValue, ParamValues, PixflowConfig, ResultArtifact, Theme};
pub use registry::{OptionsPanel, ToolDescriptor, ToolRegistry, Transform};
pub use session::{RunOutcome, Session};
pub use sink::{DownloadHandle, MemoryHost, OutputSink, UrlHost};
pub use tools::builtin_registry;
