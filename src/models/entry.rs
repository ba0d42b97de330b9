//! Entries produced by directory listings.

use crate::services::object_handle::Object;

/// A single listing result: either a real object or a directory synthesized
/// from a shared key prefix.
#[derive(Debug)]
pub enum DirEntry {
    File(Object),
    Directory(Directory),
}

impl DirEntry {
    /// Path relative to the adapter root.
    pub fn remote(&self) -> &str {
        match self {
            DirEntry::File(object) => object.remote(),
            DirEntry::Directory(dir) => &dir.name,
        }
    }

    /// Byte size as last reported by the store.
    pub fn size(&self) -> u64 {
        match self {
            DirEntry::File(object) => object.size(),
            DirEntry::Directory(dir) => dir.bytes,
        }
    }

    pub fn into_object(self) -> Option<Object> {
        match self {
            DirEntry::File(object) => Some(object),
            DirEntry::Directory(_) => None,
        }
    }
}

/// A directory with no identity of its own in the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directory {
    /// Path relative to the adapter root, without trailing `/`.
    pub name: String,

    /// Rolled-up size of everything below the directory.
    pub bytes: u64,

    /// Rolled-up object count, when the store reports one.
    pub items: Option<u64>,
}
