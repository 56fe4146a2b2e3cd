//! Attachment linking.
//!
//! Links (from step trees) and files (raw bytes) arrive independently and in
//! either order. Both feed one index keyed by an id derived from the declared
//! file name, so the final record does not depend on arrival order.
//!
//! Content type precedence, first match wins:
//! 1. type declared on a link
//! 2. type detected for the file (reader-declared, byte signature, extension)
//! 3. type already stored for the id
//!
//! With nothing resolved the record carries the generic binary type.

use std::collections::{BTreeMap, HashMap};

use freport_types::{
    Attachment, AttachmentLink, ContentTypeSource, GENERIC_BINARY_CONTENT_TYPE, RawAttachmentRef,
};
use tracing::{debug, warn};

use crate::content_type;
use crate::identity::sha256_hex;

/// Which attachments `all` returns beyond the used-and-present default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttachmentFilter {
    pub include_unused: bool,
    pub include_missed: bool,
}

impl AttachmentFilter {
    #[must_use]
    pub const fn everything() -> Self {
        Self {
            include_unused: true,
            include_missed: true,
        }
    }

    #[must_use]
    pub const fn accepts(self, attachment: &Attachment) -> bool {
        (attachment.used || self.include_unused) && (!attachment.missed || self.include_missed)
    }
}

/// Deterministic attachment id for a declared file name.
#[must_use]
pub fn attachment_id(original_file_name: &str) -> String {
    sha256_hex(original_file_name)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Build the link a raw reference stands for, without touching any index.
///
/// Returns `None` when the reference names no file at all.
#[must_use]
pub fn prepare_link(raw: &RawAttachmentRef) -> Option<AttachmentLink> {
    let file_name =
        non_empty(raw.original_file_name.as_deref()).or_else(|| non_empty(raw.name.as_deref()))?;
    Some(AttachmentLink {
        attachment_id: attachment_id(file_name),
        name: non_empty(raw.name.as_deref()).unwrap_or(file_name).to_owned(),
        original_file_name: file_name.to_owned(),
        content_type: non_empty(raw.content_type.as_deref()).map(str::to_owned),
    })
}

fn blank_record(id: &str, name: &str, original_file_name: &str) -> Attachment {
    Attachment {
        id: id.to_owned(),
        name: name.to_owned(),
        original_file_name: original_file_name.to_owned(),
        content_type: GENERIC_BINARY_CONTENT_TYPE.to_owned(),
        content_type_source: ContentTypeSource::Fallback,
        content_length: None,
        ext: String::new(),
        used: false,
        missed: false,
    }
}

/// `.ext` from the file name, else from the resolved content type.
fn refresh_ext(record: &mut Attachment) {
    record.ext = content_type::file_extension(&record.original_file_name)
        .or_else(|| content_type::extension_for(&record.content_type).map(str::to_owned))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default();
}

fn set_content_type(record: &mut Attachment, content_type: &str, source: ContentTypeSource) {
    record.content_type = content_type.to_owned();
    record.content_type_source = source;
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentLinker {
    attachments: BTreeMap<String, Attachment>,
    contents: HashMap<String, Vec<u8>>,
}

impl AttachmentLinker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link arrival: mark the attachment used and apply the link's declarations.
    pub fn register_link(&mut self, link: &AttachmentLink) -> &Attachment {
        let record = self
            .attachments
            .entry(link.attachment_id.clone())
            .or_insert_with(|| {
                blank_record(&link.attachment_id, &link.name, &link.original_file_name)
            });
        record.used = true;
        record.missed = !record.has_content();
        record.name.clone_from(&link.name);

        if let Some(declared) = link.content_type.as_deref() {
            set_content_type(record, declared, ContentTypeSource::Link);
        } else if record.content_type_source == ContentTypeSource::Fallback {
            let by_ext = content_type::file_extension(&record.original_file_name)
                .and_then(|ext| content_type::from_extension(&ext));
            if let Some(guessed) = by_ext {
                set_content_type(record, guessed, ContentTypeSource::Detected);
            }
        }
        refresh_ext(record);

        debug!(
            attachment_id = %record.id,
            file_name = %record.original_file_name,
            content_type = %record.content_type,
            missed = record.missed,
            "attachment link registered"
        );
        record
    }

    /// File arrival: store bytes and resolve the detected content type.
    pub fn register_file(
        &mut self,
        original_file_name: &str,
        declared_content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> &Attachment {
        let id = attachment_id(original_file_name);
        let detected = declared_content_type
            .filter(|ct| !ct.is_empty())
            .or_else(|| content_type::detect(original_file_name, &bytes));

        let record = self
            .attachments
            .entry(id.clone())
            .or_insert_with(|| blank_record(&id, original_file_name, original_file_name));
        record.content_length = Some(bytes.len() as u64);
        record.missed = false;
        if record.content_type_source != ContentTypeSource::Link {
            if let Some(detected) = detected {
                set_content_type(record, detected, ContentTypeSource::Detected);
            }
        }
        if record.content_type_source == ContentTypeSource::Fallback {
            warn!(
                attachment_id = %id,
                file_name = %original_file_name,
                "no content type resolved; using generic binary"
            );
        }
        refresh_ext(record);
        debug!(
            attachment_id = %id,
            file_name = %original_file_name,
            content_length = bytes.len(),
            used = record.used,
            "attachment content registered"
        );
        self.contents.insert(id, bytes);
        &*record
    }

    /// Merge a record from a state dump into the index.
    pub fn merge_record(&mut self, incoming: Attachment) {
        let Some(current) = self.attachments.get_mut(&incoming.id) else {
            self.attachments.insert(incoming.id.clone(), incoming);
            return;
        };
        if incoming.used {
            current.name.clone_from(&incoming.name);
        }
        current.used |= incoming.used;
        if incoming.content_length.is_some() {
            current.content_length = incoming.content_length;
        }
        current.missed = current.used && current.content_length.is_none();
        if incoming.content_type_source >= current.content_type_source {
            current.content_type = incoming.content_type;
            current.content_type_source = incoming.content_type_source;
        }
        refresh_ext(current);
    }

    /// Install bytes for an already-known attachment (restore path).
    ///
    /// Returns `false` when no record exists for `id`.
    pub fn restore_content(&mut self, id: &str, bytes: Vec<u8>) -> bool {
        let Some(record) = self.attachments.get_mut(id) else {
            return false;
        };
        record.content_length = Some(bytes.len() as u64);
        record.missed = false;
        self.contents.insert(id.to_owned(), bytes);
        true
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Attachment> {
        self.attachments.get(id)
    }

    #[must_use]
    pub fn content(&self, id: &str) -> Option<&[u8]> {
        self.contents.get(id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn all(&self, filter: AttachmentFilter) -> Vec<&Attachment> {
        self.attachments
            .values()
            .filter(|attachment| filter.accepts(attachment))
            .collect()
    }

    #[must_use]
    pub const fn records(&self) -> &BTreeMap<String, Attachment> {
        &self.attachments
    }

    #[must_use]
    pub const fn contents(&self) -> &HashMap<String, Vec<u8>> {
        &self.contents
    }
}
