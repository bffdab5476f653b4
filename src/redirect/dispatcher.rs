//! Redirect dispatch
//!
//! Compares a validated [`Directive`] against the incoming method and picks
//! the response: a redirect when the method matches, a soft-fail
//! `Success` body when it does not.

use std::net::SocketAddr;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response};

use super::validator::{Directive, ANY_METHOD};
use crate::http;
use crate::logger;

/// Outcome of comparing a directive with the actual request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Redirect,
    MethodMismatch,
}

/// `*` matches everything, otherwise compare ignoring ASCII case
pub fn method_matches(required: &str, actual: &Method) -> bool {
    required == ANY_METHOD || required.eq_ignore_ascii_case(actual.as_str())
}

pub fn outcome(directive: &Directive, actual: &Method) -> Outcome {
    if method_matches(&directive.required_method, actual) {
        Outcome::Redirect
    } else {
        Outcome::MethodMismatch
    }
}

/// Build the final response for a validated directive
pub fn dispatch(directive: &Directive, method: &Method, peer: SocketAddr) -> Response<Full<Bytes>> {
    match outcome(directive, method) {
        Outcome::Redirect => {
            logger::log_info(&format!(
                "[Redirect] Redirecting {peer} to {}",
                directive.target
            ));
            http::build_redirect_response_with_code(directive.status, &directive.target, method)
        }
        Outcome::MethodMismatch => {
            logger::log_info(&format!(
                "[Redirect] Redirect hit but method {method} doesn't match expected {}",
                directive.required_method
            ));
            http::build_success_response()
        }
    }
}
