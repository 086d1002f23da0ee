//! File extension from the artifact response's `Content-Type`.

/// Recognised e-print media types and the extension each one gets.
const KNOWN_TYPES: [(&str, &str); 3] = [
    ("application/x-eprint-tar", "tar"),
    ("application/pdf", "pdf"),
    ("application/x-eprint", "tex"),
];

/// Extension for `content_type`, ignoring parameters (`; charset=...`) and case.
/// Unrecognised or missing types get none.
pub fn extension_for(content_type: Option<&str>) -> Option<&'static str> {
    let media = content_type?.split(';').next()?.trim();
    KNOWN_TYPES
        .iter()
        .find(|(ty, _)| ty.eq_ignore_ascii_case(media))
        .map(|(_, ext)| *ext)
}

/// `<stem>.<ext>` or the bare stem.
pub fn file_name(stem: &str, content_type: Option<&str>) -> String {
    match extension_for(content_type) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}
