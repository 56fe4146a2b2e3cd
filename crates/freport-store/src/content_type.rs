//! Content type detection for attachment files.
//!
//! Detection order: byte signature, then file extension. Text detection is
//! a last resort for content without a recognised signature: UTF-8 with no
//! NUL bytes in the sniff window is `text/plain`.

use memchr::memchr;

/// Bytes inspected when sniffing.
const SNIFF_WINDOW: usize = 512;

/// `(signature, offset, content type)`
const MAGIC_SIGNATURES: &[(&[u8], usize, &str)] = &[
    (b"\x89PNG\r\n\x1a\n", 0, "image/png"),
    (b"\xff\xd8\xff", 0, "image/jpeg"),
    (b"GIF87a", 0, "image/gif"),
    (b"GIF89a", 0, "image/gif"),
    (b"WEBP", 8, "image/webp"),
    (b"%PDF-", 0, "application/pdf"),
    (b"PK\x03\x04", 0, "application/zip"),
    (b"\x1f\x8b", 0, "application/gzip"),
    (b"ftypmp4", 4, "video/mp4"),
    (b"ftypisom", 4, "video/mp4"),
    (b"\x1a\x45\xdf\xa3", 0, "video/webm"),
    (b"OggS", 0, "audio/ogg"),
];

/// `(extension without dot, content type)`; first entry wins for reverse lookup.
const EXTENSIONS: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("log", "text/plain"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("tsv", "text/tab-separated-values"),
    ("xml", "application/xml"),
    ("json", "application/json"),
    ("yaml", "application/yaml"),
    ("yml", "application/yaml"),
    ("js", "text/javascript"),
    ("uri", "text/uri-list"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("webp", "image/webp"),
    ("svg", "image/svg+xml"),
    ("tiff", "image/tiff"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("ogg", "audio/ogg"),
    ("diff", "text/x-diff"),
    ("patch", "text/x-diff"),
];

/// Content type from the leading bytes of a file.
#[must_use]
pub fn sniff(bytes: &[u8]) -> Option<&'static str> {
    for &(signature, offset, content_type) in MAGIC_SIGNATURES {
        if bytes.get(offset..offset + signature.len()) == Some(signature) {
            return Some(content_type);
        }
    }
    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];
    if window.is_empty() || memchr(0, window).is_some() {
        return None;
    }
    let text = match std::str::from_utf8(window) {
        Ok(text) => text,
        // A multi-byte character cut by the window edge is still text.
        Err(err) if err.error_len().is_none() => {
            std::str::from_utf8(&window[..err.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => return None,
    };
    let trimmed = text.trim_start();
    let lowered = trimmed.get(..trimmed.len().min(64)).unwrap_or(trimmed).to_ascii_lowercase();
    if lowered.starts_with("<svg") || (lowered.starts_with("<?xml") && text.contains("<svg")) {
        Some("image/svg+xml")
    } else if lowered.starts_with("<!doctype html") || lowered.starts_with("<html") {
        Some("text/html")
    } else if lowered.starts_with("<?xml") {
        Some("application/xml")
    } else {
        Some("text/plain")
    }
}

/// Extension of a file name, without the dot, lowercased.
#[must_use]
pub fn file_extension(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let (stem, ext) = base.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[must_use]
pub fn from_extension(ext: &str) -> Option<&'static str> {
    EXTENSIONS
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(ext))
        .map(|&(_, content_type)| content_type)
}

/// Canonical extension for a content type, ignoring parameters like `charset`.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or(content_type).trim();
    EXTENSIONS
        .iter()
        .find(|(_, known)| known.eq_ignore_ascii_case(essence))
        .map(|&(ext, _)| ext)
}

/// Detected content type for file bytes: signature first, then extension.
#[must_use]
pub fn detect(file_name: &str, bytes: &[u8]) -> Option<&'static str> {
    let by_ext = file_extension(file_name).and_then(|ext| from_extension(&ext));
    match sniff(bytes) {
        // Plain text is the weakest sniff; a textual extension (json, csv) is more precise.
        Some("text/plain") => by_ext.or(Some("text/plain")),
        Some(sniffed) => Some(sniffed),
        None => by_ext,
    }
}
