//! Represents a container: the flat, top-level namespace for objects.

use serde::{Deserialize, Serialize};

/// Suffix appended to a container name to form the container that holds the
/// segments of its large objects.
pub const SEGMENTS_SUFFIX: &str = "_segments";

/// A container as reported by the store.
///
/// `bytes` and `count` are the provider's rollup over every object in the
/// container (manifests count with their own zero size).
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Container name (no `/` allowed).
    pub name: String,

    /// Sum of object sizes in bytes.
    pub bytes: u64,

    /// Number of objects stored.
    pub count: u64,
}

/// Name of the container holding segments for objects stored in `container`.
pub fn segments_container(container: &str) -> String {
    format!("{container}{SEGMENTS_SUFFIX}")
}
