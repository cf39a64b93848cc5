//! Offering a capture to the user as a file.

use crate::capture::ExportConfig;
use crate::compose::CapturedImage;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while exporting a capture.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing has been captured")]
    NothingCaptured,
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Receives a finished capture and offers it to the user.
pub trait DownloadSink {
    /// Offers `image` as a named file, returning where it went.
    fn offer(&self, image: &CapturedImage) -> Result<PathBuf, ExportError>;
}

/// Writes captures into a directory as `<stem>.<ext>`.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    directory: PathBuf,
    file_stem: String,
}

impl DirectorySink {
    pub fn new(directory: impl Into<PathBuf>, file_stem: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            file_stem: file_stem.into(),
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        Self::new(config.directory.clone(), config.file_stem.clone())
    }

    /// Path a capture would be written to.
    pub fn target_path(&self, image: &CapturedImage) -> PathBuf {
        self.directory.join(image.file_name(&self.file_stem))
    }
}

impl DownloadSink for DirectorySink {
    fn offer(&self, image: &CapturedImage) -> Result<PathBuf, ExportError> {
        let path = self.target_path(image);
        let io_err = |source| ExportError::Io {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.directory).map_err(io_err)?;
        std::fs::write(&path, image.bytes()).map_err(io_err)?;

        tracing::info!(
            path = %path.display(),
            mime = image.mime_type(),
            bytes = image.bytes().len(),
            "Capture exported"
        );
        Ok(path)
    }
}
