//! External office converter (LibreOffice `soffice`)
//!
//! Legacy `.doc` normalisation and DOCX → PDF rendering are both delegated to a
//! headless office suite. Every invocation is bounded by a timeout and can be
//! cancelled; the child process is killed when either fires.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{Error, Result};

/// Default per-invocation timeout for the external converter
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Operations the batch pipeline needs from an office converter
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Probe the converter, returning its version banner
    async fn version(&self) -> Result<String>;

    /// Convert a legacy `.doc` into `<out_dir>/<stem>.docx`, returning the new path
    async fn doc_to_docx(&self, input: &Path, out_dir: &Path) -> Result<PathBuf>;

    /// Render a DOCX buffer to a PDF buffer
    async fn docx_to_pdf(&self, docx: &[u8]) -> Result<Vec<u8>>;
}

/// Sending half of a cancellation pair
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Signal cancellation to every token cloned from this pair
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving half of a cancellation pair
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a linked handle/token pair
    pub fn new() -> (CancelHandle, CancelToken) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelToken { rx })
    }

    /// A token that is never cancelled
    pub fn never() -> CancelToken {
        let (_tx, rx) = watch::channel(false);
        CancelToken { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation has been signalled
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Handle dropped without cancelling: never resolves.
            std::future::pending::<()>().await;
        }
    }
}

/// `soffice`-backed converter
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    program: String,
    timeout: Duration,
    cancel: CancelToken,
}

impl Default for SofficeConverter {
    fn default() -> Self {
        Self::new("soffice", DEFAULT_TIMEOUT)
    }
}

impl SofficeConverter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            cancel: CancelToken::never(),
        }
    }

    /// Attach a cancellation token to every invocation
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the converter once, enforcing the timeout and cancellation.
    ///
    /// `input` only labels errors.
    async fn run<I, S>(&self, input: &Path, args: I) -> Result<Vec<u8>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = ?command.as_std(), "running office converter");

        let child = command.spawn().map_err(|e| Error::ConverterUnavailable {
            program: self.program.clone(),
            reason: e.to_string(),
        })?;

        // Dropping the wait future drops the child, which kills it.
        let output = tokio::select! {
            waited = tokio::time::timeout(self.timeout, child.wait_with_output()) => match waited {
                Ok(output) => output?,
                Err(_) => {
                    return Err(Error::ConversionTimeout {
                        input: input.to_path_buf(),
                        seconds: self.timeout.as_secs(),
                    })
                }
            },
            _ = self.cancel.cancelled() => return Err(Error::Cancelled),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(Error::ConversionFailed {
                input: input.to_path_buf(),
                stderr: if stderr.is_empty() {
                    format!("converter exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }

        Ok(output.stdout)
    }

    /// Convert `input` into `out_dir` with `--convert-to <target>`, returning the produced file
    async fn convert_into(&self, input: &Path, out_dir: &Path, target: &str) -> Result<PathBuf> {
        let stem = input
            .file_stem()
            .ok_or_else(|| Error::General(format!("Invalid input filename: {}", input.display())))?;
        let produced = out_dir.join(format!("{}.{}", stem.to_string_lossy(), target));

        self.run(
            input,
            [
                OsStr::new("--headless"),
                OsStr::new("--convert-to"),
                OsStr::new(target),
                OsStr::new("--outdir"),
                out_dir.as_os_str(),
                input.as_os_str(),
            ],
        )
        .await?;

        if !produced.exists() {
            return Err(Error::MissingOutput(produced));
        }

        Ok(produced)
    }
}

#[async_trait]
impl DocumentConverter for SofficeConverter {
    async fn version(&self) -> Result<String> {
        let stdout = self.run(Path::new(&self.program), ["--version"]).await.map_err(|e| match e {
            Error::ConverterUnavailable { .. } => e,
            other => Error::ConverterUnavailable {
                program: self.program.clone(),
                reason: other.to_string(),
            },
        })?;

        Ok(String::from_utf8_lossy(&stdout).trim().to_string())
    }

    async fn doc_to_docx(&self, input: &Path, out_dir: &Path) -> Result<PathBuf> {
        self.convert_into(input, out_dir, "docx").await
    }

    async fn docx_to_pdf(&self, docx: &[u8]) -> Result<Vec<u8>> {
        let work_dir = tempfile::tempdir()?;
        let source = work_dir.path().join("source.docx");
        tokio::fs::write(&source, docx).await?;

        let pdf_path = self.convert_into(&source, work_dir.path(), "pdf").await?;
        Ok(tokio::fs::read(&pdf_path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let converter = SofficeConverter::new("docbatch-no-such-converter", Duration::from_secs(5));
        let result = converter.version().await;
        assert!(matches!(result.unwrap_err(), Error::ConverterUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_never_token_is_not_cancelled() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());
        let waited = tokio::time::timeout(Duration::from_millis(20), token.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_cancel_handle_resolves_token() {
        let (handle, token) = CancelToken::new();
        handle.cancel();
        assert!(token.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), token.cancelled())
            .await
            .expect("token should resolve after cancel");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_hung_converter() {
        let converter = SofficeConverter::new("sleep", Duration::from_millis(100));
        let result = converter.run(Path::new("hung.docx"), ["5"]).await;
        assert!(matches!(result.unwrap_err(), Error::ConversionTimeout { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancel_interrupts_running_converter() {
        let (handle, token) = CancelToken::new();
        let converter = SofficeConverter::new("sleep", Duration::from_secs(30)).with_cancel(token);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.cancel();
        });
        let result = converter.run(Path::new("slow.docx"), ["5"]).await;
        assert!(matches!(result.unwrap_err(), Error::Cancelled));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_spawn() {
        let (handle, token) = CancelToken::new();
        handle.cancel();
        let converter = SofficeConverter::new("docbatch-no-such-converter", Duration::from_secs(5))
            .with_cancel(token);
        let result = converter.run(Path::new("skipped.docx"), ["--version"]).await;
        assert!(matches!(result.unwrap_err(), Error::Cancelled));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_conversion_failure() {
        let converter = SofficeConverter::new("false", Duration::from_secs(5));
        let result = converter.run(Path::new("bad.doc"), Vec::<String>::new()).await;
        assert!(matches!(result.unwrap_err(), Error::ConversionFailed { .. }));
    }
}
