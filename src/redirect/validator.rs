//! Directive validation
//!
//! Turns a [`RawDirective`] into a [`Directive`]: the status string is
//! bounded to the 3xx range (silently falling back to 307) and path-form
//! targets are base64url decoded.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use hyper::StatusCode;
use thiserror::Error;

use super::decoder::RawDirective;

/// Status used when none is given or the given one is unusable
pub const DEFAULT_STATUS: StatusCode = StatusCode::TEMPORARY_REDIRECT;

/// Wildcard accepted in place of a method name
pub const ANY_METHOD: &str = "*";

/// Validated redirect instruction for a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// Method name (compared case-insensitively) or `*`
    pub required_method: String,
    /// Always within 300..=399
    pub status: StatusCode,
    /// Destination, deliberately not validated
    pub target: String,
}

/// Failure to turn a raw directive into a [`Directive`]
#[derive(Debug, Error)]
pub enum DirectiveError {
    /// The path-form target is not valid base64url
    #[error("error base64 decoding {input}: {source}")]
    Decode {
        input: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// Validate a raw directive
pub fn validate(raw: RawDirective) -> Result<Directive, DirectiveError> {
    let status = resolve_status(raw.status());

    let (required_method, target) = match raw {
        RawDirective::Query { method, target, .. } => (method, target),
        RawDirective::Path {
            method,
            encoded_target,
            ..
        } => {
            let target = decode_target(&encoded_target)?;
            (method, target)
        }
    };

    Ok(Directive {
        required_method,
        status,
        target,
    })
}

/// Parse a status string, falling back to [`DEFAULT_STATUS`] when it is
/// empty, not a number, or outside 300..=399. Never an error.
pub fn resolve_status(status: &str) -> StatusCode {
    status
        .parse::<i64>()
        .ok()
        .filter(|code| (300..=399).contains(code))
        .and_then(|code| u16::try_from(code).ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(DEFAULT_STATUS)
}

/// Decode a padded base64url target. Invalid UTF-8 is replaced rather than
/// rejected.
fn decode_target(encoded: &str) -> Result<String, DirectiveError> {
    let bytes = URL_SAFE
        .decode(encoded)
        .map_err(|source| DirectiveError::Decode {
            input: encoded.to_string(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
