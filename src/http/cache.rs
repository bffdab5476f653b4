//! Conditional request handling
//!
//! Files are validated by modification time only: `Last-Modified` out,
//! `If-Modified-Since` in. HTTP dates have one-second resolution, so both
//! sides are truncated to whole seconds before comparing.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Truncate to whole seconds since the epoch
fn whole_seconds(time: SystemTime) -> SystemTime {
    time.duration_since(UNIX_EPOCH)
        .map_or(time, |d| UNIX_EPOCH + Duration::from_secs(d.as_secs()))
}

/// Format a modification time for the `Last-Modified` header
///
/// Returns `None` for times before the epoch, which cannot be expressed.
pub fn last_modified_header(modified: SystemTime) -> Option<String> {
    if modified <= UNIX_EPOCH {
        return None;
    }
    Some(httpdate::fmt_http_date(whole_seconds(modified)))
}

/// True when the client's copy is current and a 304 should be sent
///
/// An unparsable `If-Modified-Since` is ignored.
pub fn is_not_modified(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    let Some(header) = if_modified_since else {
        return false;
    };
    let Ok(since) = httpdate::parse_http_date(header.trim()) else {
        return false;
    };
    whole_seconds(modified) <= since
}
