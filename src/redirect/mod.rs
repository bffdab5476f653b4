//! Redirect directive resolver
//!
//! Serves `/redir` and `/redir/*`. The redirect target, trigger method and
//! status code travel in the request itself:
//!
//! ```text
//! /redir/<required_method>/<base64url(target)>
//! /redir/<required_method>/<status_code>/<base64url(target)>
//! /redir?method=<required_method>&status=<status_code>&redir=<target>
//! ```
//!
//! Nothing is stored between requests.

pub mod decoder;
pub mod dispatcher;
pub mod validator;

use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};

use crate::http;
use crate::logger;

pub use decoder::{is_redirect_path, RawDirective, REDIRECT_PREFIX};
pub use dispatcher::{method_matches, Outcome};
pub use validator::{resolve_status, Directive, DirectiveError, DEFAULT_STATUS};

/// Resolve the directive carried by `req` and answer it
///
/// Decode failures become a plain 404; the reason only goes to the log.
pub fn handle_redirect<B>(req: &Request<B>, peer: SocketAddr) -> Response<Full<Bytes>> {
    let raw = decoder::decode(req.uri().path(), req.uri().query());

    match validator::validate(raw) {
        Ok(directive) => dispatcher::dispatch(&directive, req.method(), peer),
        Err(e) => {
            logger::log_warning(&format!("[Redirect] {e}"));
            http::build_404_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use hyper::header::{CONTENT_TYPE, LOCATION};
    use hyper::{Method, StatusCode};

    const EXAMPLE_B64: &str = "aHR0cHM6Ly9leGFtcGxlLmNvbQ==";

    fn request(method: Method, uri: &str) -> Request<()> {
        Request::builder().method(method).uri(uri).body(()).unwrap()
    }

    fn peer() -> SocketAddr {
        "192.0.2.10:51000".parse().unwrap()
    }

    async fn body_string(resp: Response<Full<Bytes>>) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_path_form_default_status() {
        let resp = handle_redirect(&request(Method::GET, &format!("/redir/GET/{EXAMPLE_B64}")), peer());
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers()[LOCATION], "https://example.com");
    }

    #[test]
    fn test_path_form_explicit_status() {
        for code in [300_u16, 301, 302, 303, 307, 308, 399] {
            let uri = format!("/redir/*/{code}/{EXAMPLE_B64}");
            let resp = handle_redirect(&request(Method::PUT, &uri), peer());
            assert_eq!(resp.status().as_u16(), code);
            assert_eq!(resp.headers()[LOCATION], "https://example.com");
        }
    }

    #[test]
    fn test_path_form_bad_status_falls_back() {
        for status in ["200", "400", "abc", "1000"] {
            let uri = format!("/redir/GET/{status}/{EXAMPLE_B64}");
            let resp = handle_redirect(&request(Method::GET, &uri), peer());
            assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_method_mismatch_soft_fails() {
        let uri = format!("/redir/POST/303/{EXAMPLE_B64}");
        let resp = handle_redirect(&request(Method::GET, &uri), peer());
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().get(LOCATION).is_none());
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(body_string(resp).await, "Success\n");
    }

    #[test]
    fn test_method_match_is_case_insensitive() {
        let uri = format!("/redir/post/{EXAMPLE_B64}");
        let resp = handle_redirect(&request(Method::POST, &uri), peer());
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn test_malformed_base64_is_404() {
        let resp = handle_redirect(&request(Method::GET, "/redir/GET/not-valid-base64!!"), peer());
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_string(resp).await;
        assert!(!body.contains("base64"));
        assert!(!body.contains("not-valid"));
    }

    #[tokio::test]
    async fn test_bare_prefix_is_not_a_crash() {
        // Empty method never matches GET, so this is a soft fail
        let resp = handle_redirect(&request(Method::GET, "/redir"), peer());
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_string(resp).await, "Success\n");

        let resp = handle_redirect(&request(Method::GET, "/redir/"), peer());
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_query_form_is_verbatim() {
        let resp = handle_redirect(
            &request(Method::GET, "/redir?method=*&redir=https://example.com"),
            peer(),
        );
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers()[LOCATION], "https://example.com");

        let resp = handle_redirect(
            &request(Method::GET, &format!("/redir?method=*&status=302&redir={EXAMPLE_B64}")),
            peer(),
        );
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[LOCATION], EXAMPLE_B64);
    }

    #[test]
    fn test_query_form_on_subpath_ignores_path() {
        let resp = handle_redirect(
            &request(Method::DELETE, "/redir/GET/garbage!!?method=delete&redir=/next"),
            peer(),
        );
        assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(resp.headers()[LOCATION], "/next");
    }

    #[test]
    fn test_repeated_requests_are_independent() {
        let req = request(Method::GET, &format!("/redir/GET/302/{EXAMPLE_B64}"));
        let first = handle_redirect(&req, peer());
        let second = handle_redirect(&req, peer());
        assert_eq!(first.status(), second.status());
        assert_eq!(first.headers()[LOCATION], second.headers()[LOCATION]);
    }
}
