//! Error types for the docbatch library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the docbatch library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// DOCX package (ZIP) error
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Malformed XML part inside a DOCX package
    #[error("Malformed XML in {part}: {message}")]
    Xml { part: String, message: String },

    /// Stamp image could not be decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Stamp image is neither JPEG nor PNG
    #[error("Unsupported stamp image format: {0}")]
    UnsupportedImage(String),

    /// Input directory does not exist
    #[error("Input directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// The external office converter cannot be run
    #[error("Office converter `{program}` is not available: {reason}")]
    ConverterUnavailable { program: String, reason: String },

    /// The external office converter exited unsuccessfully
    #[error("Conversion of {} failed: {stderr}", .input.display())]
    ConversionFailed { input: PathBuf, stderr: String },

    /// The external office converter did not finish in time
    #[error("Conversion of {} timed out after {seconds}s", .input.display())]
    ConversionTimeout { input: PathBuf, seconds: u64 },

    /// The batch was cancelled while a conversion was running
    #[error("Conversion cancelled")]
    Cancelled,

    /// The converter reported success but produced no file
    #[error("Converter output not found: {}", .0.display())]
    MissingOutput(PathBuf),

    /// Footer rewrite failed for a specific document
    #[error("Footer update failed for {file}: {source}")]
    Footer {
        file: String,
        #[source]
        source: Box<Error>,
    },

    /// General error
    #[error("{0}")]
    General(String),
}
