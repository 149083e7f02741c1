//! OCR boundary: decode an uploaded scan, normalize it, and hand it to an engine.
//!
//! PDF input is a known limitation. Only single-page raster scans (JPG, PNG)
//! are read; anything else fails fast with `UnsupportedFormat`.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use image::{ImageFormat, RgbImage};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio::runtime;
use tokio::time::timeout;
use tracing::debug;

use super::upload::DocumentKind;

/// Language and layout mode passed to the OCR engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrSettings {
    pub language: String,
    pub mode: String,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            // LSTM engine, assume a single uniform block of text.
            mode: "--oem 3 --psm 6".to_string(),
        }
    }
}

/// External OCR engine contract.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &RgbImage, settings: &OcrSettings) -> Result<String, OcrEngineError>;
}

#[derive(Debug, thiserror::Error)]
pub enum OcrEngineError {
    #[error("failed to stage image for OCR: {0}")]
    Staging(String),
    #[error("failed to launch OCR engine '{command}': {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start OCR runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed while waiting for OCR engine: {0}")]
    Wait(#[source] std::io::Error),
    #[error("OCR engine did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("OCR engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("{0}")]
    Engine(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("unsupported format '{0}': only single-page JPG or PNG scans can be read")]
    UnsupportedFormat(String),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("OCR processing failed: {0}")]
    Engine(#[from] OcrEngineError),
}

/// Turns uploaded raster scans into plain text through an [`OcrEngine`].
pub struct TextExtractor<E> {
    engine: Arc<E>,
    settings: OcrSettings,
}

impl<E> TextExtractor<E>
where
    E: OcrEngine,
{
    pub fn new(engine: Arc<E>, settings: OcrSettings) -> Self {
        Self { engine, settings }
    }

    pub fn settings(&self) -> &OcrSettings {
        &self.settings
    }

    pub fn extract(&self, bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractionError> {
        let format = match kind {
            DocumentKind::Png => ImageFormat::Png,
            DocumentKind::Jpeg => ImageFormat::Jpeg,
            DocumentKind::Pdf => {
                return Err(ExtractionError::UnsupportedFormat(
                    kind.canonical_mime().to_string(),
                ))
            }
        };

        let decoded = image::load_from_memory_with_format(bytes, format)?;
        let rgb = decoded.to_rgb8();
        debug!(
            width = rgb.width(),
            height = rgb.height(),
            "running OCR on normalized scan"
        );

        let text = self.engine.recognize(&rgb, &self.settings)?;
        Ok(text.trim().to_string())
    }
}

/// A normalized scan written to a temporary PNG. The file is removed when dropped.
pub struct StagedImage {
    file: NamedTempFile,
}

impl StagedImage {
    pub fn write(image: &RgbImage) -> Result<Self, OcrEngineError> {
        let mut file = tempfile::Builder::new()
            .prefix("credential-scan-")
            .suffix(".png")
            .tempfile()
            .map_err(|err| OcrEngineError::Staging(err.to_string()))?;

        image
            .write_to(file.as_file_mut(), ImageFormat::Png)
            .map_err(|err| OcrEngineError::Staging(err.to_string()))?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Runs the `tesseract` command-line binary against a staged copy of the scan.
///
/// Each call drives the child on its own current-thread runtime, so callers
/// must be on a blocking thread (`spawn_blocking` in the HTTP host), never on
/// an async worker.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: PathBuf,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(command: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    fn command(&self, input: &Path, settings: &OcrSettings) -> Command {
        let mut command = Command::new(&self.command);
        command
            .arg(input)
            .arg("stdout")
            .arg("-l")
            .arg(&settings.language)
            .args(settings.mode.split_whitespace())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn run(&self, input: &Path, settings: &OcrSettings) -> Result<String, OcrEngineError> {
        let child = self
            .command(input, settings)
            .spawn()
            .map_err(|source| OcrEngineError::Launch {
                command: self.command.display().to_string(),
                source,
            })?;

        // Dropping the pending future drops the child, which kills it.
        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| OcrEngineError::TimedOut(self.timeout))?
            .map_err(OcrEngineError::Wait)?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(OcrEngineError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &RgbImage, settings: &OcrSettings) -> Result<String, OcrEngineError> {
        let staged = StagedImage::write(image)?;
        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(OcrEngineError::Runtime)?;

        runtime.block_on(self.run(staged.path(), settings))
    }
}
