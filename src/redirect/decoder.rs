//! Directive decoding
//!
//! Pulls the raw `(method, status, target)` triplet out of a request without
//! interpreting any of the values. Two encodings exist and exactly one is
//! chosen per request: the query form whenever a `redir` parameter is
//! present, the path form otherwise.

use percent_encoding::percent_decode_str;
use url::form_urlencoded;

/// Path prefix owned by the redirect resolver
pub const REDIRECT_PREFIX: &str = "/redir";

/// Returns true for `/redir` and anything below `/redir/`
///
/// Takes the raw URI path; the prefix is matched after percent-decoding, the
/// same view [`decode`] works on.
pub fn is_redirect_path(path: &str) -> bool {
    percent_decode_str(path)
        .decode_utf8_lossy()
        .strip_prefix(REDIRECT_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Undecoded directive, tagged by the encoding it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDirective {
    /// `?method=<M>&status=<S>&redir=<URL>`, target is used verbatim
    Query {
        method: String,
        status: String,
        target: String,
    },
    /// `/redir/<M>[/<S>]/<base64url(URL)>`, target still needs decoding
    Path {
        method: String,
        status: String,
        encoded_target: String,
    },
}

impl RawDirective {
    /// Required method as written by the client
    pub fn method(&self) -> &str {
        match self {
            Self::Query { method, .. } | Self::Path { method, .. } => method,
        }
    }

    /// Status string as written by the client (possibly empty)
    pub fn status(&self) -> &str {
        match self {
            Self::Query { status, .. } | Self::Path { status, .. } => status,
        }
    }
}

/// Decode a directive from the raw (still percent-encoded) URI path and query
pub fn decode(path: &str, query: Option<&str>) -> RawDirective {
    if let Some(directive) = query.and_then(decode_query) {
        return directive;
    }

    let path = percent_decode_str(path).decode_utf8_lossy();
    decode_path(&path)
}

/// Query form. Returns `None` when `redir` is absent, so the caller falls
/// back to the path form.
fn decode_query(query: &str) -> Option<RawDirective> {
    let mut method = None;
    let mut status = None;
    let mut target = None;

    // First occurrence of each key wins
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        let slot = match key.as_ref() {
            "method" => &mut method,
            "status" => &mut status,
            "redir" => &mut target,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }

    Some(RawDirective::Query {
        target: target?,
        method: method.unwrap_or_default(),
        status: status.unwrap_or_default(),
    })
}

/// Path form. The number of segments decides whether the second one is a
/// status code: three segments means `<method>/<status>/<target>`, two means
/// `<method>/<target>`. Anything after the third segment is ignored.
fn decode_path(path: &str) -> RawDirective {
    let suffix = path.strip_prefix(REDIRECT_PREFIX).unwrap_or(path);
    let suffix = suffix.strip_prefix('/').unwrap_or(suffix);

    let (method, rest) = suffix.split_once('/').unwrap_or((suffix, ""));
    let (status, encoded_target) = match rest.split_once('/') {
        Some((status, tail)) if !tail.is_empty() => {
            let target = tail.split('/').next().unwrap_or_default();
            (status, target)
        }
        Some((only, _)) => ("", only),
        None => ("", rest),
    };

    RawDirective::Path {
        method: method.to_string(),
        status: status.to_string(),
        encoded_target: encoded_target.to_string(),
    }
}
