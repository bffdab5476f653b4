//! HTTP response building module
//!
//! Builders for every response the server emits. Builder failures are
//! logged and replaced with a bare response, never a panic.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, LAST_MODIFIED, LOCATION,
};
use hyper::{Method, Response, StatusCode};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const TEXT_HTML: &str = "text/html; charset=utf-8";

/// Plain text error page, e.g. `404 page not found\n`
fn build_text_response(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .header("X-Content-Type-Options", "nosniff")
        .body(Full::new(Bytes::from_static(text.as_bytes())))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::from_static(text.as_bytes())))
        })
}

/// Build 400 Bad Request response
pub fn build_400_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::BAD_REQUEST, "400 Bad Request\n")
}

/// Build 403 Forbidden response
pub fn build_403_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::FORBIDDEN, "403 Forbidden\n")
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::NOT_FOUND, "404 page not found\n")
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large\n")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response<Full<Bytes>> {
    build_text_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error\n")
}

/// Build the `Success\n` answer for a redirect whose method did not match
pub fn build_success_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .body(Full::new(Bytes::from_static(b"Success\n")))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::from_static(b"Success\n")))
        })
}

/// Build a redirect with an arbitrary 3xx code
///
/// `GET` gets a short HTML body linking to the target, other methods an
/// empty one.
pub fn build_redirect_response_with_code(
    status: StatusCode,
    target: &str,
    method: &Method,
) -> Response<Full<Bytes>> {
    let location = sanitize_location(target);
    let mut builder = Response::builder()
        .status(status)
        .header(LOCATION, location.as_str());

    let body = if *method == Method::GET || *method == Method::HEAD {
        builder = builder.header(CONTENT_TYPE, TEXT_HTML);
        let reason = status.canonical_reason().unwrap_or("Redirect");
        let html = format!("<a href=\"{}\">{reason}</a>.\n", escape_html(&location));
        if *method == Method::HEAD {
            Bytes::new()
        } else {
            Bytes::from(html)
        }
    } else {
        Bytes::new()
    };

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 301 Moved Permanently used by the directory server
pub fn build_moved_response(location: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, sanitize_location(location))
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(last_modified: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(LAST_MODIFIED, last_modified)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: usize) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::RANGE_NOT_SATISFIABLE)
        .header(CONTENT_TYPE, TEXT_PLAIN)
        .header(CONTENT_RANGE, format!("bytes */{file_size}"))
        .body(Full::new(Bytes::from_static(b"416 Range Not Satisfiable\n")))
        .unwrap_or_else(|e| {
            log_build_error("416", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build generic HTML response (directory listings)
pub fn build_html_response(content: String, is_head: bool) -> Response<Full<Bytes>> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, TEXT_HTML)
        .header(CONTENT_LENGTH, content_length)
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 200 response for a whole file
pub fn build_file_response(
    data: Bytes,
    content_type: &str,
    last_modified: Option<&str>,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(ACCEPT_RANGES, "bytes");
    if let Some(last_modified) = last_modified {
        builder = builder.header(LAST_MODIFIED, last_modified);
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error("200", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build 206 Partial Content response
pub fn build_partial_response(
    data: Bytes,
    content_type: &str,
    last_modified: Option<&str>,
    range: std::ops::RangeInclusive<usize>,
    total_size: usize,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let (start, end) = (*range.start(), *range.end());
    let content_length = end - start + 1;
    let body = if is_head { Bytes::new() } else { data };

    let mut builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(CONTENT_RANGE, format!("bytes {start}-{end}/{total_size}"))
        .header(ACCEPT_RANGES, "bytes");
    if let Some(last_modified) = last_modified {
        builder = builder.header(LAST_MODIFIED, last_modified);
    }

    builder.body(Full::new(body)).unwrap_or_else(|e| {
        log_build_error("206", &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Make a redirect target safe for the `Location` header
///
/// CR/LF become spaces, other control bytes and bytes outside ASCII are
/// percent-escaped; the rest of the target is passed through untouched.
pub fn sanitize_location(target: &str) -> String {
    let mut out = String::with_capacity(target.len());
    for byte in target.bytes() {
        match byte {
            b'\r' | b'\n' => out.push(' '),
            0x00..=0x1f | 0x7f..=0xff => out.push_str(&format!("%{byte:02x}")),
            _ => out.push(char::from(byte)),
        }
    }
    out
}

/// Escape text for inclusion in HTML
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
