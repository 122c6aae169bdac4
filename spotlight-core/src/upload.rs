//! Step 2 of the wizard: picking and validating the statement PDF.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

pub const PDF_MIME: &str = "application/pdf";

/// Largest accepted upload, inclusive.
pub const MAX_UPLOAD_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Please upload a PDF file")]
    NotPdf { mime_type: String },

    #[error("File size must be less than 16MB")]
    TooLarge { byte_size: u64 },

    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// MIME type as a file picker would report it, from the extension only.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => PDF_MIME,
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// Type check first, then size.
pub fn validate(mime_type: &str, byte_size: u64) -> Result<(), UploadError> {
    if mime_type != PDF_MIME {
        return Err(UploadError::NotPdf {
            mime_type: mime_type.to_string(),
        });
    }
    if byte_size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge { byte_size });
    }
    Ok(())
}

/// A validated statement ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub filename: String,
    pub byte_size: u64,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadCandidate {
    pub fn from_bytes(
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, UploadError> {
        let mime_type = mime_type.into();
        let byte_size = bytes.len() as u64;
        validate(&mime_type, byte_size)?;
        Ok(Self {
            filename: filename.into(),
            byte_size,
            mime_type,
            bytes,
        })
    }

    /// Load from disk. The size limit is checked against metadata before
    /// the file is read.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let io_err = |source| UploadError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mime_type = mime_for_path(path);
        let meta = fs::metadata(path).map_err(io_err)?;
        validate(mime_type, meta.len())?;

        let bytes = fs::read(path).map_err(io_err)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "statement.pdf".to_string());

        Self::from_bytes(filename, mime_type, bytes)
    }
}

/// Component-local state of the upload step.
#[derive(Debug, Default)]
pub struct FileUpload {
    candidate: Option<UploadCandidate>,
    error: Option<String>,
    drag_hover: bool,
}

impl FileUpload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn candidate(&self) -> Option<&UploadCandidate> {
        self.candidate.as_ref()
    }

    pub fn has_file(&self) -> bool {
        self.candidate.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn is_drag_hover(&self) -> bool {
        self.drag_hover
    }

    pub fn set_drag_hover(&mut self, hovering: bool) {
        self.drag_hover = hovering;
    }

    /// File chosen through a picker.
    pub fn offer_picked(&mut self, path: impl AsRef<Path>) -> Result<(), UploadError> {
        self.offer(UploadCandidate::from_path(path))
    }

    /// Files dropped onto the drop zone; only the first one is considered.
    pub fn offer_dropped(&mut self, paths: &[PathBuf]) -> Result<(), UploadError> {
        self.drag_hover = false;
        match paths.first() {
            Some(p) => self.offer(UploadCandidate::from_path(p)),
            None => Ok(()),
        }
    }

    /// Shared acceptance rule for every input path.
    ///
    /// A rejection records the message and leaves any held candidate in
    /// place; an acceptance replaces it and clears the error.
    pub fn offer(
        &mut self,
        candidate: Result<UploadCandidate, UploadError>,
    ) -> Result<(), UploadError> {
        match candidate {
            Ok(c) => {
                info!(file = %c.filename, bytes = c.byte_size, "statement accepted");
                self.candidate = Some(c);
                self.error = None;
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, "statement rejected");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn clear(&mut self) {
        self.candidate = None;
        self.error = None;
        self.drag_hover = false;
    }
}
