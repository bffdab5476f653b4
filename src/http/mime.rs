//! Content-Type detection
//!
//! Known extensions map to a fixed type. Anything else is sniffed: text
//! that decodes as UTF-8 without NUL bytes is served as plain text, the rest
//! as an octet stream.

use std::path::Path;

/// How many leading bytes are inspected when sniffing
const SNIFF_LEN: usize = 512;

fn by_extension(extension: &str) -> Option<&'static str> {
    let content_type = match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" | "md" | "log" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "xml" => "text/xml; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        _ => return None,
    };
    Some(content_type)
}

/// Sniff the leading bytes of a body
fn sniff(data: &[u8]) -> &'static str {
    let head = &data[..data.len().min(SNIFF_LEN)];
    if head.contains(&0) {
        return "application/octet-stream";
    }
    match std::str::from_utf8(head) {
        Ok(_) => "text/plain; charset=utf-8",
        // A multi-byte character cut off at the sniff boundary is still text
        Err(e) if e.error_len().is_none() && head.len() == SNIFF_LEN => "text/plain; charset=utf-8",
        Err(_) => "application/octet-stream",
    }
}

/// Content-Type for a file, by extension first and by content second
///
/// ```
/// use dirserve::http::mime::content_type_for;
/// use std::path::Path;
///
/// assert_eq!(content_type_for(Path::new("index.html"), b""), "text/html; charset=utf-8");
/// assert_eq!(content_type_for(Path::new("README"), b"plain words"), "text/plain; charset=utf-8");
/// assert_eq!(content_type_for(Path::new("blob"), &[0, 159, 146]), "application/octet-stream");
/// ```
pub fn content_type_for(path: &Path, data: &[u8]) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(by_extension)
        .unwrap_or_else(|| sniff(data))
}
