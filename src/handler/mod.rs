//! Request handler module
//!
//! Responsible for request routing dispatch and business logic processing:
//! the redirect resolver, the directory file server and verbose tracing.

pub mod router;
pub mod static_files;
pub mod trace;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response};

use crate::config::Config;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    peer: SocketAddr,
    config: Arc<Config>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if config.features.verbose {
        return Ok(trace::handle_traced(req, peer, &config).await);
    }
    Ok(router::route(&req, peer, &config).await)
}
