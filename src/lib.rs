//! docbatch Library
//!
//! Batch jobs for preparing office documents for publication:
//! - Rewrite the footers of DOC/DOCX files and render them to PDF
//! - Stamp an image (e.g. a QR code) onto every page of a set of PDFs
//! - Generate SQL insert statements describing a directory of PDFs
//!
//! Every pipeline processes its files one at a time and reports a
//! per-file outcome instead of stopping at the first failure.
//!
//! # Example
//!
//! ```no_run
//! use docbatch::batch::{run_convert_batch, ConvertOptions};
//! use docbatch::convert::SofficeConverter;
//!
//! # async fn demo() -> docbatch::Result<()> {
//! let report = run_convert_batch(&SofficeConverter::default(), &ConvertOptions::default()).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod convert;
pub mod docx;
pub mod error;
pub mod logging;
pub mod pdf;
pub mod scan;
pub mod sql;

// Re-export commonly used items
pub use error::{Error, Result};
