use thiserror::Error;

/// Primary error type for FrankenReport store operations.
///
/// Ingestion degrades gracefully and almost never produces one of these.
/// The loud failures are malformed dumps, bad configuration, unreadable
/// attachment sources and history I/O.
#[derive(Error, Debug)]
pub enum ReportError {
    // === Dump Errors ===
    /// A state dump was structurally unusable (not an object, wrong types).
    #[error("invalid state dump: {detail}")]
    InvalidDump { detail: String },

    /// A state dump was written by a newer schema than this store understands.
    #[error("unsupported dump schema version {found} (max supported {supported})")]
    UnsupportedDumpVersion { found: u32, supported: u32 },

    // === Configuration Errors ===
    /// Store configuration failed validation.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    /// Two configured environments share a name.
    #[error("duplicate environment name: {name}")]
    DuplicateEnvironment { name: String },

    // === Attachment Errors ===
    /// Attachment bytes could not be read from their source.
    #[error("cannot read attachment '{file_name}': {detail}")]
    AttachmentRead { file_name: String, detail: String },

    // === History Errors ===
    /// The history source failed to load or persist data points.
    #[error("history source error: {detail}")]
    History { detail: String },

    // === Encoding / I/O ===
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration decoding error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ReportError {
    /// Whether the caller can likely fix this without code changes.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidDump { .. }
                | Self::UnsupportedDumpVersion { .. }
                | Self::Config { .. }
                | Self::DuplicateEnvironment { .. }
                | Self::AttachmentRead { .. }
                | Self::Toml(_)
        )
    }

    /// Human-friendly suggestion for fixing this error.
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidDump { .. } => {
                Some("Pass the JSON object produced by dump_state() from a compatible store")
            }
            Self::UnsupportedDumpVersion { .. } => {
                Some("Upgrade the store that restores the dump to the producer's version")
            }
            Self::Config { .. } | Self::DuplicateEnvironment { .. } => {
                Some("Check the environments section of the store configuration")
            }
            Self::AttachmentRead { .. } => Some("Verify the attachment file exists and is readable"),
            Self::History { .. } => {
                Some("Check that the history location exists and is writable")
            }
            _ => None,
        }
    }

    /// Create an invalid-dump error.
    pub fn invalid_dump(detail: impl Into<String>) -> Self {
        Self::InvalidDump {
            detail: detail.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Create an attachment read error.
    pub fn attachment_read(file_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::AttachmentRead {
            file_name: file_name.into(),
            detail: detail.into(),
        }
    }

    /// Create a history source error.
    pub fn history(detail: impl Into<String>) -> Self {
        Self::History {
            detail: detail.into(),
        }
    }
}

/// Result type alias using `ReportError`.
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_invalid_dump() {
        let err = ReportError::invalid_dump("expected a JSON object, got array");
        assert_eq!(
            err.to_string(),
            "invalid state dump: expected a JSON object, got array"
        );
    }

    #[test]
    fn error_display_version() {
        let err = ReportError::UnsupportedDumpVersion {
            found: 9,
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "unsupported dump schema version 9 (max supported 1)"
        );
    }

    #[test]
    fn error_display_history() {
        let err = ReportError::history("cannot open runs.jsonl: permission denied");
        assert_eq!(
            err.to_string(),
            "history source error: cannot open runs.jsonl: permission denied"
        );
    }

    #[test]
    fn user_recoverable() {
        assert!(ReportError::invalid_dump("x").is_user_recoverable());
        assert!(ReportError::config("x").is_user_recoverable());
        assert!(ReportError::attachment_read("a.png", "gone").is_user_recoverable());
        assert!(!ReportError::history("disk").is_user_recoverable());
    }

    #[test]
    fn suggestions() {
        assert!(ReportError::invalid_dump("x").suggestion().is_some());
        assert!(
            ReportError::DuplicateEnvironment {
                name: "linux".to_owned()
            }
            .suggestion()
            .is_some()
        );
        assert!(ReportError::history("disk").suggestion().is_some());
        let io_err = std::io::Error::other("boom");
        assert!(ReportError::from(io_err).suggestion().is_none());
    }

    #[test]
    fn io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: ReportError = io_err.into();
        assert!(matches!(err, ReportError::Io(_)));
    }

    #[test]
    fn json_error_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ReportError = json_err.into();
        assert!(matches!(err, ReportError::Json(_)));
        assert!(!err.is_user_recoverable());
    }
}
