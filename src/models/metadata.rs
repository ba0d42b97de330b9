//! Object headers and the custom metadata conventions layered on them.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Header naming the segment prefix of a dynamic large object.
pub const OBJECT_MANIFEST_HEADER: &str = "X-Object-Manifest";

/// Header present on static large objects.
pub const STATIC_LARGE_OBJECT_HEADER: &str = "X-Static-Large-Object";

/// Custom metadata header carrying the high precision modification time.
pub const MTIME_HEADER: &str = "X-Object-Meta-Mtime";

/// Prefix shared by all object headers that must survive a metadata update.
pub const OBJECT_HEADER_PREFIX: &str = "X-Object-";

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Object headers keyed by canonical name (`X-Object-Meta-Mtime`).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&canonical_header_key(name)).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&canonical_header_key(name))
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(canonical_header_key(name), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&canonical_header_key(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read the modification time from [`MTIME_HEADER`].
    ///
    /// Returns `None` when the header is missing or malformed.
    pub fn mod_time(&self) -> Option<DateTime<Utc>> {
        self.get(MTIME_HEADER).and_then(float_string_to_time)
    }

    /// Store `t` in [`MTIME_HEADER`].
    pub fn set_mod_time(&mut self, t: DateTime<Utc>) {
        self.insert(MTIME_HEADER, time_to_float_string(t));
    }

    /// Headers carrying only the given modification time.
    pub fn with_mod_time(t: DateTime<Utc>) -> Self {
        let mut headers = Self::new();
        headers.set_mod_time(t);
        headers
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k.as_ref(), v);
        }
        headers
    }
}

/// Canonical MIME header form: first letter and letters after `-` upper
/// case, the rest lower case.
pub fn canonical_header_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// Encode a timestamp as decimal seconds since the epoch with up to nine
/// fractional digits and no trailing zeros (`1444235124.5`).
pub fn time_to_float_string(t: DateTime<Utc>) -> String {
    match t.timestamp_nanos_opt() {
        Some(ns) => nanos_to_float_string(ns),
        None => t.timestamp().to_string(),
    }
}

fn nanos_to_float_string(ns: i64) -> String {
    if ns < 0 {
        return match ns.checked_neg() {
            Some(pos) => format!("-{}", nanos_to_float_string(pos)),
            None => ns.to_string(),
        };
    }
    let secs = ns / NANOS_PER_SEC;
    let frac = ns % NANOS_PER_SEC;
    if frac == 0 {
        return secs.to_string();
    }
    let decimals = format!("{frac:09}");
    format!("{secs}.{}", decimals.trim_end_matches('0'))
}

/// Parse the output of [`time_to_float_string`].
pub fn float_string_to_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (secs, frac) = s.split_once('.').unwrap_or((s, ""));
    if secs.is_empty() && frac.is_empty() {
        return None;
    }
    if !secs.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let secs: i64 = if secs.is_empty() { 0 } else { secs.parse().ok()? };
    let mut frac = frac.to_string();
    frac.truncate(9);
    while frac.len() < 9 {
        frac.push('0');
    }
    let nanos: i64 = frac.parse().ok()?;
    let total = secs.checked_mul(NANOS_PER_SEC)?.checked_add(nanos)?;
    let total = if negative { -total } else { total };
    Some(Utc.timestamp_nanos(total))
}
