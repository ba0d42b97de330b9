//! Hierarchical file access over a Swift-style object store.
//!
//! Containers hold flat keys; directories are emulated from `/`-separated
//! key prefixes, and objects above the chunk size are stored as dynamic
//! large objects (a manifest plus numbered segments in `<container>_segments`).

pub mod backends;
pub mod client;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;

pub use client::{ClientError, ObjectClient};
pub use config::FsOptions;
pub use errors::{Error, Result};
pub use models::entry::{DirEntry, Directory};
pub use services::{
    object_handle::{Object, ObjectSource},
    swift_fs::{HashType, SwiftFs},
};
