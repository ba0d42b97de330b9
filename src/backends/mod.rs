//! [`ObjectClient`](crate::client::ObjectClient) implementations.
//!
//! - [`memory::MemoryClient`] keeps everything in process and records every
//!   call, which makes it the backend of choice for tests.
//! - [`local::LocalStore`] persists metadata in SQLite and payloads on disk.
//!
//! Both share the listing page assembly in [`PageBuilder`].

pub mod local;
pub mod memory;

use crate::{
    client::{ByteStream, ListOpts},
    models::object::ObjectInfo,
};
use futures::TryStreamExt;
use std::ops::Range;

/// Assembles one listing page from keys fed in byte order.
///
/// Keys that share a delimiter-terminated segment after the prefix are folded
/// into a single pseudo-directory entry. Folded keys are contiguous in byte
/// order, so the rollup is computed in the same pass.
pub(crate) struct PageBuilder {
    prefix: String,
    delimiter: Option<char>,
    limit: usize,
    skip: Option<String>,
    items: Vec<ObjectInfo>,
    open: Option<ObjectInfo>,
}

impl PageBuilder {
    pub(crate) fn new(opts: &ListOpts) -> Self {
        // A marker naming a pseudo-directory means everything below it was
        // already returned.
        let skip = match (&opts.marker, opts.delimiter) {
            (Some(marker), Some(delim)) if marker.ends_with(delim) => Some(marker.clone()),
            _ => None,
        };
        Self {
            prefix: opts.prefix.clone(),
            delimiter: opts.delimiter,
            limit: opts.limit.max(1),
            skip,
            items: Vec::new(),
            open: None,
        }
    }

    /// Offer the next key. Returns `false` once the page is full.
    pub(crate) fn push(&mut self, info: ObjectInfo) -> bool {
        if !info.name.starts_with(&self.prefix) {
            return true;
        }
        if let Some(skip) = &self.skip {
            if info.name.starts_with(skip.as_str()) {
                return true;
            }
        }
        if let Some(open) = self.open.as_mut() {
            if info.name.starts_with(open.name.as_str()) {
                open.bytes += info.bytes;
                open.count = Some(open.count.unwrap_or(0) + 1);
                if info.last_modified > open.last_modified {
                    open.last_modified = info.last_modified;
                }
                return true;
            }
        }
        self.close_open();
        if self.items.len() >= self.limit {
            return false;
        }

        if let Some(delim) = self.delimiter {
            let rest = &info.name[self.prefix.len()..];
            if let Some(pos) = rest.find(delim) {
                let name = format!("{}{}", self.prefix, &rest[..pos + delim.len_utf8()]);
                self.open = Some(ObjectInfo {
                    name,
                    bytes: info.bytes,
                    content_type: String::new(),
                    hash: String::new(),
                    last_modified: info.last_modified,
                    count: Some(1),
                });
                return true;
            }
        }
        self.items.push(info);
        true
    }

    pub(crate) fn finish(mut self) -> Vec<ObjectInfo> {
        self.close_open();
        self.items
    }

    fn close_open(&mut self) {
        if let Some(open) = self.open.take() {
            self.items.push(open);
        }
    }
}

/// Restrict a payload stream to `range`.
pub(crate) fn slice_stream(stream: ByteStream, range: Range<u64>) -> ByteStream {
    let (start, end) = (range.start, range.end);
    let mut pos = 0u64;
    Box::pin(stream.try_filter_map(move |chunk| {
        let chunk_start = pos;
        let chunk_end = pos + chunk.len() as u64;
        pos = chunk_end;
        let lo = start.max(chunk_start);
        let hi = end.min(chunk_end);
        let out = if lo < hi {
            Some(chunk.slice((lo - chunk_start) as usize..(hi - chunk_start) as usize))
        } else {
            None
        };
        futures::future::ready(Ok(out))
    }))
}

/// Key at which the next page starts reading: keys below the marker, or
/// below a folded pseudo-directory, have already been returned.
pub(crate) fn list_start(opts: &ListOpts) -> &str {
    opts.marker.as_deref().unwrap_or("")
}
