use serde::{Deserialize, Serialize};

/// Content type used when neither the link nor the file resolves one.
pub const GENERIC_BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Where an attachment's resolved content type came from.
///
/// Ordering matters: a higher source is never replaced by a lower one.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ContentTypeSource {
    /// Nothing resolved a type; `content_type` holds the generic binary type.
    #[default]
    Fallback,
    /// Sniffed from bytes, declared by the reader, or guessed from the extension.
    Detected,
    /// Explicitly declared on a step's attachment link.
    Link,
}

/// One record per physical attachment file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Derived from `original_file_name`, so links can be registered before content.
    pub id: String,
    pub name: String,
    pub original_file_name: String,
    pub content_type: String,
    #[serde(default)]
    pub content_type_source: ContentTypeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// File extension including the leading dot, or empty.
    #[serde(default)]
    pub ext: String,
    /// Referenced by at least one step.
    #[serde(default)]
    pub used: bool,
    /// Referenced, but its bytes never arrived.
    #[serde(default)]
    pub missed: bool,
}

impl Attachment {
    /// Whether content bytes have been observed for this attachment.
    #[must_use]
    pub fn has_content(&self) -> bool {
        self.content_length.is_some()
    }
}
