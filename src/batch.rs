//! Sequential batch pipelines
//!
//! Files are processed one at a time. Each file ends in a [`FileOutcome`];
//! a failure is recorded and the batch moves on to the next file.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use crate::convert::DocumentConverter;
use crate::docx::rewrite_footers;
use crate::error::{Error, Result};
use crate::pdf::{stamp_pdf, StampImage, StampOptions};
use crate::scan::{extension_lowercase, scan_directory, OFFICE_EXTENSIONS, PDF_EXTENSIONS};

/// Footer written into every converted document
pub const DEFAULT_FOOTER_TEXT: &str = "© 2025 100分冲刺 / 天天练MAX ycy88.com";

/// Settings for the DOC/DOCX → PDF pipeline
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub footer_text: String,
    /// Stamp the rendered PDFs with this image when set
    pub stamp_image: Option<PathBuf>,
    pub stamp: StampOptions,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./docs"),
            output_dir: PathBuf::from("./output"),
            footer_text: DEFAULT_FOOTER_TEXT.to_string(),
            stamp_image: None,
            stamp: StampOptions::default(),
        }
    }
}

/// Settings for the stand-alone PDF stamping pipeline
#[derive(Debug, Clone)]
pub struct StampBatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub image_path: PathBuf,
    pub stamp: StampOptions,
}

impl Default for StampBatchOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./docs"),
            output_dir: PathBuf::from("./output"),
            image_path: PathBuf::from("./cc100-qrcode.jpg"),
            stamp: StampOptions::default(),
        }
    }
}

/// What happened to one input file
#[derive(Debug)]
pub enum FileOutcome {
    Succeeded {
        source: PathBuf,
        /// Files written for this input, in the order they were written
        outputs: Vec<PathBuf>,
    },
    Failed {
        source: PathBuf,
        error: Error,
    },
}

impl FileOutcome {
    pub fn source(&self) -> &Path {
        match self {
            FileOutcome::Succeeded { source, .. } | FileOutcome::Failed { source, .. } => source.as_path(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Succeeded { .. })
    }
}

/// Per-file results of one batch run
#[derive(Debug)]
pub struct BatchReport {
    pub output_dir: PathBuf,
    pub outcomes: Vec<FileOutcome>,
    /// Set when the run stopped early because it was cancelled
    pub cancelled: bool,
}

impl BatchReport {
    fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            outcomes: Vec::new(),
            cancelled: false,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Path, &Error)> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            FileOutcome::Failed { error, .. } => Some((outcome.source(), error)),
            FileOutcome::Succeeded { .. } => None,
        })
    }

    fn record(&mut self, source: PathBuf, result: Result<Vec<PathBuf>>) {
        let name = display_file_name(&source);
        match result {
            Ok(outputs) => {
                info!(file = %name, "processed");
                self.outcomes.push(FileOutcome::Succeeded { source, outputs });
            }
            Err(error) => {
                error!(file = %name, %error, "processing failed");
                if matches!(error, Error::Cancelled) {
                    self.cancelled = true;
                }
                self.outcomes.push(FileOutcome::Failed { source, error });
            }
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Succeeded: {}", self.succeeded())?;
        writeln!(f, "Failed: {}", self.failed())?;
        if self.cancelled {
            writeln!(f, "Cancelled before all files were processed")?;
        }
        write!(f, "Output directory: {}", self.output_dir.display())
    }
}

fn display_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| Error::General(format!("Invalid file name: {}", path.display())))
}

/// Rewrite footers and render PDFs for every `.doc`/`.docx` in the input directory.
///
/// The converter is probed once up front; if it cannot run, nothing is
/// processed and the error is returned. Per-file failures end up in the report.
pub async fn run_convert_batch<C>(converter: &C, options: &ConvertOptions) -> Result<BatchReport>
where
    C: DocumentConverter + ?Sized,
{
    tokio::fs::create_dir_all(&options.output_dir).await?;

    let version = converter.version().await?;
    info!(%version, "office converter available");

    let stamp_image = options
        .stamp_image
        .as_deref()
        .map(StampImage::load)
        .transpose()?;

    let files = scan_directory(&options.input_dir, OFFICE_EXTENSIONS)?;
    let mut report = BatchReport::new(&options.output_dir);

    if files.is_empty() {
        warn!(dir = %options.input_dir.display(), "no DOC/DOCX files found");
        return Ok(report);
    }

    info!(count = files.len(), "found DOC/DOCX files, starting");

    for file in files {
        info!(file = %display_file_name(&file), "processing");
        let result = convert_one(converter, &file, options, stamp_image.as_ref()).await;
        report.record(file, result);

        if report.cancelled {
            warn!("batch cancelled, skipping remaining files");
            break;
        }
    }

    Ok(report)
}

async fn convert_one<C>(
    converter: &C,
    path: &Path,
    options: &ConvertOptions,
    stamp_image: Option<&StampImage>,
) -> Result<Vec<PathBuf>>
where
    C: DocumentConverter + ?Sized,
{
    let stem = file_stem(path)?;
    let mut outputs = Vec::new();

    let docx = if extension_lowercase(path).as_deref() == Some("doc") {
        let normalized = converter.doc_to_docx(path, &options.output_dir).await?;
        let bytes = tokio::fs::read(&normalized).await?;
        outputs.push(normalized);
        bytes
    } else {
        tokio::fs::read(path).await?
    };

    let rewritten = rewrite_footers(&docx, &options.footer_text).map_err(|e| Error::Footer {
        file: display_file_name(path),
        source: Box::new(e),
    })?;

    let docx_path = options.output_dir.join(format!("{stem}.docx"));
    tokio::fs::write(&docx_path, &rewritten.bytes).await?;
    if !outputs.contains(&docx_path) {
        outputs.push(docx_path);
    }

    let mut pdf = converter.docx_to_pdf(&rewritten.bytes).await?;
    if let Some(image) = stamp_image {
        pdf = stamp_pdf(&pdf, image, &options.stamp)?;
    }

    let pdf_path = options.output_dir.join(format!("{stem}.pdf"));
    tokio::fs::write(&pdf_path, &pdf).await?;
    outputs.push(pdf_path);

    Ok(outputs)
}

/// Stamp the image onto every page of every PDF in the input directory.
///
/// The image is decoded once before any PDF is touched; a missing or
/// unsupported image fails the whole run.
pub async fn run_stamp_batch(options: &StampBatchOptions) -> Result<BatchReport> {
    tokio::fs::create_dir_all(&options.output_dir).await?;

    let image = StampImage::load(&options.image_path)?;
    let files = scan_directory(&options.input_dir, PDF_EXTENSIONS)?;
    let mut report = BatchReport::new(&options.output_dir);

    if files.is_empty() {
        warn!(dir = %options.input_dir.display(), "no PDF files found");
        return Ok(report);
    }

    info!(count = files.len(), "found PDF files, starting");

    for file in files {
        info!(file = %display_file_name(&file), "processing");
        let result = stamp_one(&file, &image, options).await;
        report.record(file, result);
    }

    Ok(report)
}

async fn stamp_one(path: &Path, image: &StampImage, options: &StampBatchOptions) -> Result<Vec<PathBuf>> {
    let pdf = tokio::fs::read(path).await?;
    let stamped = stamp_pdf(&pdf, image, &options.stamp)?;

    let out_path = options.output_dir.join(format!("{}.pdf", file_stem(path)?));
    tokio::fs::write(&out_path, stamped).await?;

    Ok(vec![out_path])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts_and_summary() {
        let mut report = BatchReport::new(Path::new("out"));
        report.record(PathBuf::from("a.docx"), Ok(vec![PathBuf::from("out/a.pdf")]));
        report.record(
            PathBuf::from("b.docx"),
            Err(Error::General("broken".to_string())),
        );

        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.cancelled);

        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, Path::new("b.docx"));

        let summary = report.to_string();
        assert!(summary.contains("Succeeded: 1"));
        assert!(summary.contains("Failed: 1"));
        assert!(summary.contains("Output directory: out"));
    }

    #[test]
    fn test_cancelled_outcome_marks_report() {
        let mut report = BatchReport::new(Path::new("out"));
        report.record(PathBuf::from("a.doc"), Err(Error::Cancelled));
        assert!(report.cancelled);
        assert!(report.to_string().contains("Cancelled"));
    }

    #[test]
    fn test_default_options_use_project_directories() {
        let options = ConvertOptions::default();
        assert_eq!(options.input_dir, PathBuf::from("./docs"));
        assert_eq!(options.output_dir, PathBuf::from("./output"));
        assert!(options.stamp_image.is_none());
        assert_eq!(StampBatchOptions::default().image_path, PathBuf::from("./cc100-qrcode.jpg"));
    }
}
