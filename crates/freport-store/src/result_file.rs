//! Attachment content sources handed to `visit_attachment_file`.

use std::path::{Path, PathBuf};

use freport_error::{ReportError, Result};

/// A file produced by a test run whose bytes can be read on demand.
pub trait ResultFile {
    /// Declared file name; attachment ids are derived from it.
    fn original_file_name(&self) -> &str;

    /// Content type declared by the reader, if it knows one.
    fn content_type(&self) -> Option<&str> {
        None
    }

    /// Read the full content.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::AttachmentRead`] when the bytes are unavailable.
    fn read_content(&self) -> Result<Vec<u8>>;
}

/// In-memory file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferResultFile {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

impl BufferResultFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

impl ResultFile for BufferResultFile {
    fn original_file_name(&self) -> &str {
        &self.file_name
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn read_content(&self) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// File on disk, read when the store ingests it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResultFile {
    path: PathBuf,
    file_name: String,
    content_type: Option<String>,
}

impl PathResultFile {
    /// The declared file name is the final path component.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            file_name,
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultFile for PathResultFile {
    fn original_file_name(&self) -> &str {
        &self.file_name
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn read_content(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path)
            .map_err(|err| ReportError::attachment_read(self.file_name.clone(), err.to_string()))
    }
}
