//! Represents an object (file) stored in a container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content type reserved for directory marker objects.
///
/// Other tools create zero-byte objects with this type to represent an
/// explicitly created, possibly empty, directory.
pub const DIRECTORY_MARKER_CONTENT_TYPE: &str = "application/directory";

/// Metadata for a single key as returned by a listing or a `HEAD`.
///
/// Listings of dynamic large objects report the manifest's own zero size; a
/// `HEAD` on the same key reports the size of the concatenated segments.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Full key within the container.
    pub name: String,

    /// Size in bytes.
    pub bytes: u64,

    /// Content type (MIME type).
    pub content_type: String,

    /// Provider checksum (MD5 hex). Meaningless for large objects.
    pub hash: String,

    /// Provider last-modified time (coarse precision).
    pub last_modified: DateTime<Utc>,

    /// Number of objects rolled up under a pseudo-directory listing entry.
    /// `None` for real objects.
    pub count: Option<u64>,
}

impl ObjectInfo {
    /// True if this key is a directory marker placeholder.
    pub fn is_directory_marker(&self) -> bool {
        self.content_type == DIRECTORY_MARKER_CONTENT_TYPE
    }
}
