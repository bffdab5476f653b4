//! Request routing dispatch module
//!
//! Entry point for every request after connection handling: `/redir`
//! resolution, or the body size check, CORS preflight and static files,
//! then the common response decorations and the access log line.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_LENGTH, SERVER};
use hyper::{Request, Response};

use crate::config::Config;
use crate::handler::static_files;
use crate::http::{self, cors};
use crate::logger::{self, AccessLogEntry};
use crate::redirect;

/// Route one request and produce its response
pub async fn route<B>(req: &Request<B>, peer: SocketAddr, config: &Config) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let entry = config
        .logging
        .access_log
        .then(|| AccessLogEntry::from_request(req, peer));

    let mut response = dispatch(req, peer, config).await;

    if let Ok(server) = HeaderValue::from_str(&config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }

    if let Some(mut entry) = entry {
        let body_bytes = response.body().size_hint().exact().unwrap_or(0);
        entry.finish(response.status().as_u16(), body_bytes, started.elapsed());
        logger::log_access(&entry, &config.logging.access_log_format);
    }

    response
}

async fn dispatch<B>(req: &Request<B>, peer: SocketAddr, config: &Config) -> Response<Full<Bytes>> {
    let mut response = if config.features.redirect && redirect::is_redirect_path(req.uri().path()) {
        // 1. Redirect directives take any method and never look at the body
        redirect::handle_redirect(req, peer)
    } else {
        // 2. Check body size
        if let Some(resp) = check_body_size(req, config.http.max_body_size) {
            return resp;
        }

        // 3. CORS preflight never reaches the file server
        if config.features.cors && cors::is_preflight(req) {
            return cors::build_preflight_response(req);
        }

        // 4. The served directory
        static_files::serve(req, Path::new(&config.server.directory)).await
    };

    if config.features.cors {
        cors::apply_cors_headers(req.headers(), req.method(), &mut response);
    }

    response
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}
