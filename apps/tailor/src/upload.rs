//! Resume file acquisition: validates a chosen `.tex` file and decodes it as text.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Only LaTeX sources can be tailored.
pub const REQUIRED_EXTENSION: &str = ".tex";
/// 10 MiB. A file of exactly this size is accepted.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please upload a .tex file only")]
    InvalidExtension,

    #[error("File size must be less than 10MB")]
    TooLarge { size: u64 },

    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UploadError {
    /// Validation failures are the user's to correct; IO failures are not.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            UploadError::InvalidExtension | UploadError::TooLarge { .. }
        )
    }
}

/// A validated resume, decoded and ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub size: u64,
    pub content: String,
}

/// Checks name and size before anything is read.
pub fn validate_resume_file(file_name: &str, size: u64) -> Result<(), UploadError> {
    if !file_name.ends_with(REQUIRED_EXTENSION) {
        return Err(UploadError::InvalidExtension);
    }

    if size > MAX_FILE_BYTES {
        return Err(UploadError::TooLarge { size });
    }

    Ok(())
}

/// Validates `path` from its metadata, then reads it as is.
///
/// Returns the file name with the raw bytes.
pub async fn read_resume_bytes(path: &Path) -> Result<(String, Vec<u8>), UploadError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let metadata = tokio::fs::metadata(path).await.map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if let Err(err) = validate_resume_file(&file_name, metadata.len()) {
        warn!(file = %file_name, size = metadata.len(), "Rejected resume file: {err}");
        return Err(err);
    }

    let bytes = tokio::fs::read(path).await.map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    Ok((file_name, bytes))
}

/// Validates `path`, then reads and decodes it.
///
/// Invalid UTF-8 sequences are replaced rather than rejected.
pub async fn load_resume(path: &Path) -> Result<ResumeFile, UploadError> {
    let (file_name, bytes) = read_resume_bytes(path).await?;
    let content = decode_text(&bytes);
    info!("Loaded resume {file_name} ({} bytes)", bytes.len());

    Ok(ResumeFile {
        file_name,
        size: bytes.len() as u64,
        content,
    })
}

fn decode_text(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    // Drop a UTF-8 byte order mark the way text decoders do.
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}
