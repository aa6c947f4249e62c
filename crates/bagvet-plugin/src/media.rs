//! # Media Type Table
//!
//! The static extension/media-type mapping shared by the bundled
//! plugins. Derived from the Apache httpd mime.types registry, trimmed
//! to the formats that occur in preservation payloads.

/// Media types with their recognized file-name extensions.
pub const MEDIA_TYPES: &[(&str, &[&str])] = &[
    ("application/pdf", &["pdf"]),
    ("audio/vnd.wave", &["wav", "wave"]),
    ("audio/x-aiff", &["aif", "aiff", "aifc"]),
    ("image/bmp", &["bmp"]),
    ("image/gif", &["gif"]),
    ("image/jp2", &["jp2"]),
    ("image/jpeg", &["jpeg", "jpg", "jpe"]),
    ("image/png", &["png"]),
    ("image/tiff", &["tiff", "tif"]),
    ("text/csv", &["csv"]),
    ("text/html", &["html", "htm"]),
    ("text/plain", &["txt", "text", "conf", "def", "list", "log", "in"]),
    ("text/xml", &["xml"]),
    ("video/webm", &["webm"]),
    ("video/x-matroska", &["mkv", "mk3d", "mks"]),
];

/// Look up the media type for a file-name extension (case-insensitive).
pub fn media_type_for_extension(extension: &str) -> Option<&'static str> {
    let extension = extension.to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(_, extensions)| extensions.contains(&extension.as_str()))
        .map(|(media_type, _)| *media_type)
}

/// The extensions recognized for a media type.
pub fn extensions_for(media_type: &str) -> Option<&'static [&'static str]> {
    MEDIA_TYPES
        .iter()
        .find(|(candidate, _)| *candidate == media_type)
        .map(|(_, extensions)| *extensions)
}

/// Every media type in the table, in table order.
pub fn known_media_types() -> Vec<String> {
    MEDIA_TYPES.iter().map(|(m, _)| (*m).to_string()).collect()
}
