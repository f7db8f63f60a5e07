//! Error types for the pixflow-core library.

use thiserror::Error;

/// Main error type for the pixflow library.
#[derive(Error, Debug)]
pub enum PixflowError {
    /// No tool is registered under the given id.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A tool with this id is already registered.
    #[error("tool already registered: {0}")]
    DuplicateTool(String),

    /// A selected file is not accepted by the tool.
    #[error("{tool_id} does not accept {file} ({mime})")]
    UnsupportedFile {
        tool_id: String,
        file: String,
        mime: String,
    },

    /// Another transform is already running.
    #[error("a tool is already running")]
    Busy,

    /// The file set is empty.
    #[error("no files selected")]
    NoFiles,

    /// No tool has been selected.
    #[error("no tool selected")]
    NoActiveTool,

    /// A parameter value does not fit the tool's schema.
    #[error("invalid value for {key}: {reason}")]
    InvalidParameter { key: String, reason: String },

    /// The transform (or one of its collaborators) failed.
    #[error("{tool_id} failed: {cause}")]
    Transform {
        tool_id: String,
        #[source]
        cause: TransformError,
    },

    /// Output sink error.
    #[error("output error: {0}")]
    Sink(#[from] SinkError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised inside a transform or by an external collaborator.
#[derive(Error, Debug)]
pub enum TransformError {
    /// Image decoding or encoding failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// PDF loading, editing or serialization failed.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// A required collaborator is not available.
    #[error("{0} is not available")]
    Unavailable(String),

    /// The input files cannot be processed by this tool.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A captured parameter is missing or has the wrong type.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors related to publishing download handles.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The host environment refused to create a handle.
    #[error("host error: {0}")]
    Host(String),
}

/// Result type for the pixflow library.
pub type Result<T> = std::result::Result<T, PixflowError>;
