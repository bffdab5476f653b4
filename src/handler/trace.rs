//! Verbose request tracing
//!
//! Buffers the request body, runs the router on the replayed request and
//! afterwards prints the request line, the sorted request headers and the
//! body. Only the inbound request is mirrored; the response is untouched.

use std::error::Error;
use std::fmt::Write as _;
use std::net::SocketAddr;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::{HeaderMap, Request, Response};

use crate::config::Config;
use crate::handler::router;
use crate::http;
use crate::logger;

const SEPARATOR: &str = "-----------------------------";

/// Trace the request around a normal routing pass
pub async fn handle_traced<B>(req: Request<B>, peer: SocketAddr, config: &Config) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let (req, body) = match buffer_request(req, config.http.max_body_size, peer).await {
        Ok(buffered) => buffered,
        Err(response) => return response,
    };
    let response = router::route(&req, peer, config).await;

    let request_line = format!("{} {} {:?}", req.method(), req.uri(), req.version());
    logger::log_trace(&format_trace(&request_line, req.headers(), &body));

    response
}

/// Read the whole body (at most `max_body_size` bytes) and rebuild the
/// request around a replayable copy of it
///
/// Returns the rebuilt request and the bytes read, or the error response to
/// send when the body is too large (413) or unreadable (400).
async fn buffer_request<B>(
    req: Request<B>,
    max_body_size: u64,
    peer: SocketAddr,
) -> Result<(Request<Full<Bytes>>, Bytes), Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn Error + Send + Sync>>,
{
    let (parts, body) = req.into_parts();
    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);

    let body = match Limited::new(body, limit).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            logger::log_warning(&format!(
                "Request body from {peer} exceeds {limit} bytes, not traced"
            ));
            return Err(http::build_413_response());
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body from {peer}: {e}"));
            return Err(http::build_400_response());
        }
    };

    Ok((Request::from_parts(parts, Full::new(body.clone())), body))
}

/// `content-type` -> `Content-Type`
fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
        upper = c == '-';
    }
    out
}

/// Render one trace block, separators included
fn format_trace(request_line: &str, headers: &HeaderMap, body: &[u8]) -> String {
    let mut names: Vec<&str> = headers.keys().map(hyper::header::HeaderName::as_str).collect();
    names.sort_unstable();

    let mut block = String::new();
    let _ = writeln!(block, "{SEPARATOR}");
    let _ = writeln!(block, "{request_line}");
    for name in names {
        let values: Vec<String> = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect();
        let _ = writeln!(block, "{}: {}", canonical_header_name(name), values.join(", "));
    }
    if !body.is_empty() {
        let _ = writeln!(block);
        let _ = writeln!(block, "{}", String::from_utf8_lossy(body));
    }
    block.push_str(SEPARATOR);
    block
}
