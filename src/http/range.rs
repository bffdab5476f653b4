//! Single byte-range requests
//!
//! Only one `bytes=` range per request is honored. Multi-range and other
//! units fall back to the full body.

use std::ops::RangeInclusive;

/// What the `Range` header asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByteRange {
    /// Serve this inclusive slice with 206
    Partial(RangeInclusive<usize>),
    /// Answer 416
    Unsatisfiable,
    /// Ignore the header and serve everything
    Full,
}

impl ByteRange {
    /// Interpret a `Range` header against a body of `len` bytes
    ///
    /// ```
    /// use dirserve::http::range::ByteRange;
    ///
    /// assert_eq!(ByteRange::parse(Some("bytes=0-99"), 1000), ByteRange::Partial(0..=99));
    /// assert_eq!(ByteRange::parse(Some("bytes=-10"), 1000), ByteRange::Partial(990..=999));
    /// assert_eq!(ByteRange::parse(None, 1000), ByteRange::Full);
    /// ```
    pub fn parse(header: Option<&str>, len: usize) -> Self {
        let Some(spec) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
            return Self::Full;
        };
        if spec.contains(',') {
            return Self::Full;
        }
        let Some((first, last)) = spec.split_once('-') else {
            return Self::Full;
        };
        let (first, last) = (first.trim(), last.trim());

        if len == 0 {
            return Self::Unsatisfiable;
        }

        if first.is_empty() {
            // Suffix form: the last N bytes
            return match last.parse::<usize>() {
                Ok(0) => Self::Unsatisfiable,
                Ok(n) => Self::Partial(len.saturating_sub(n)..=len - 1),
                Err(_) => Self::Full,
            };
        }

        let Ok(start) = first.parse::<usize>() else {
            return Self::Full;
        };
        if start >= len {
            return Self::Unsatisfiable;
        }

        let end = if last.is_empty() {
            len - 1
        } else {
            match last.parse::<usize>() {
                Ok(end) if end < start => return Self::Full,
                Ok(end) => end.min(len - 1),
                Err(_) => return Self::Full,
            }
        };

        Self::Partial(start..=end)
    }
}
