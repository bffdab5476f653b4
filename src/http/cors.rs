//! Permissive CORS
//!
//! Any origin, the common methods, any requested header, no credentials.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS, ACCESS_CONTROL_REQUEST_METHOD,
    ORIGIN, VARY,
};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};

/// Methods a cross-origin caller may use
const ALLOWED_METHODS: [Method; 6] = [
    Method::HEAD,
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

fn is_allowed_method(method: &str) -> bool {
    ALLOWED_METHODS
        .iter()
        .any(|m| m.as_str().eq_ignore_ascii_case(method))
}

/// `OPTIONS` with both `Origin` and `Access-Control-Request-Method`
pub fn is_preflight<B>(req: &Request<B>) -> bool {
    req.method() == Method::OPTIONS
        && req.headers().contains_key(ORIGIN)
        && req.headers().contains_key(ACCESS_CONTROL_REQUEST_METHOD)
}

/// Answer a preflight. Always 204; the allow headers are only present when
/// the requested method is acceptable.
pub fn build_preflight_response<B>(req: &Request<B>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;

    let headers = response.headers_mut();
    headers.insert(
        VARY,
        HeaderValue::from_static(
            "Origin, Access-Control-Request-Method, Access-Control-Request-Headers",
        ),
    );

    let requested = req
        .headers()
        .get(ACCESS_CONTROL_REQUEST_METHOD)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    if !is_allowed_method(requested) {
        crate::logger::log_debug(&format!(
            "[CORS] Preflight aborted: method '{requested}' not allowed"
        ));
        return response;
    }

    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    if let Ok(value) = HeaderValue::from_str(&requested.to_ascii_uppercase()) {
        headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
    }
    if let Some(requested_headers) = req.headers().get(ACCESS_CONTROL_REQUEST_HEADERS) {
        if !requested_headers.is_empty() {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, requested_headers.clone());
        }
    }

    response
}

/// Decorate the response to an actual (non-preflight) request
pub fn apply_cors_headers(
    request_headers: &HeaderMap,
    method: &Method,
    response: &mut Response<Full<Bytes>>,
) {
    let headers = response.headers_mut();
    headers.append(VARY, HeaderValue::from_static("Origin"));

    if request_headers.contains_key(ORIGIN) && is_allowed_method(method.as_str()) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    }
}
