//! Naming of large-object segments and their manifest.
//!
//! Segments of `<root><remote>` live in the segments container under
//! `<root><remote>/<timestamp>/<size>/<index>`, where `<timestamp>/<size>` is
//! the unique prefix of one upload attempt and `<index>` is zero-padded to
//! eight digits.

use super::metadata::time_to_float_string;
use chrono::{TimeZone, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::sync::atomic::{AtomicI64, Ordering};

/// Everything except ASCII alphanumerics, `/` and `.` is escaped in a
/// manifest header value. `&` in particular must not pass through.
const MANIFEST_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'/').remove(b'.');

static LAST_PREFIX_NANOS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Identifies the segment namespace of a single upload attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniquePrefix(String);

impl UniquePrefix {
    /// Build a prefix for an upload of `size` bytes.
    ///
    /// Timestamps are strictly increasing within the process, so two uploads
    /// of the same key never share a segment namespace.
    pub fn new(size: u64) -> Self {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX);
        let mut nanos = now;
        let _ = LAST_PREFIX_NANOS.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            nanos = now.max(last.saturating_add(1));
            Some(nanos)
        });
        let stamp = time_to_float_string(Utc.timestamp_nanos(nanos));
        Self(format!("{stamp}/{size}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The prefix with its trailing delimiter, as matched by the reaper.
    pub fn with_delimiter(&self) -> String {
        format!("{}/", self.0)
    }
}

/// Key of the directory holding all segment sets of `key`.
pub fn segments_root(key: &str) -> String {
    format!("{key}/")
}

/// True if `relative`, a key below `segments_root`, is a segment of that key
/// itself: `<timestamp>/<size>/<index>`. Deeper keys hold segments of a
/// nested object such as `key/child`.
pub fn is_own_segment(relative: &str) -> bool {
    let parts: Vec<&str> = relative.split('/').collect();
    match parts.as_slice() {
        [stamp, size, index] => {
            stamp.parse::<f64>().is_ok()
                && !size.is_empty()
                && size.bytes().all(|b| b.is_ascii_digit())
                && index.len() == 8
                && index.bytes().all(|b| b.is_ascii_digit())
        }
        _ => false,
    }
}

/// Key prefix of the segments written by one upload attempt.
pub fn segments_path(key: &str, prefix: &UniquePrefix) -> String {
    format!("{key}/{}", prefix.as_str())
}

/// Key of segment `index` under `segments_path`.
pub fn segment_key(segments_path: &str, index: usize) -> String {
    format!("{segments_path}/{index:08}")
}

/// Value of the manifest header pointing at `container/segments_path`.
pub fn manifest_value(container: &str, segments_path: &str) -> String {
    url_encode(&format!("{container}/{segments_path}"))
}

/// Escape `s` for use in a manifest header, leaving `/` and `.` literal.
pub fn url_encode(s: &str) -> String {
    utf8_percent_encode(s, MANIFEST_ESCAPE).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encode() {
        assert_eq!(url_encode("c_segments/dir/file.txt"), "c%5Fsegments/dir/file.txt");
        assert_eq!(url_encode("a&b=c d"), "a%26b%3Dc%20d");
        assert_eq!(url_encode("ünï"), "%C3%BCn%C3%AF");
        assert_eq!(url_encode("1444235124.5/42"), "1444235124.5/42");
    }

    #[test]
    fn test_segment_key_padding() {
        assert_eq!(segment_key("a/b/1.5/10", 0), "a/b/1.5/10/00000000");
        assert_eq!(segment_key("a/b/1.5/10", 123), "a/b/1.5/10/00000123");
    }

    #[test]
    fn test_unique_prefix_is_unique() {
        let first = UniquePrefix::new(100);
        let second = UniquePrefix::new(100);
        assert_ne!(first, second);
        assert!(first.as_str().ends_with("/100"));
        assert_eq!(first.with_delimiter(), format!("{}/", first.as_str()));
    }

    #[test]
    fn test_is_own_segment() {
        assert!(is_own_segment("1444235124.5/42/00000003"));
        assert!(is_own_segment("1/4/00000000"));
        assert!(!is_own_segment("b/1444235124.5/42/00000003"));
        assert!(!is_own_segment("1.5/42/3"));
        assert!(!is_own_segment("1.5/4x/00000003"));
        assert!(!is_own_segment("notes.txt"));

        let prefix = UniquePrefix::new(9);
        let key = segment_key(prefix.as_str(), 12);
        assert!(is_own_segment(&key));
    }

    #[test]
    fn test_manifest_value() {
        let prefix = UniquePrefix::new(7);
        let path = segments_path("dir/file", &prefix);
        let value = manifest_value("photos_segments", &path);
        assert!(value.starts_with("photos%5Fsegments/dir/file/"));
        assert!(value.ends_with("/7"));
    }
}
