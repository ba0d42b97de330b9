//! The file system adapter built on an [`ObjectClient`](crate::client::ObjectClient).
//!
//! [`swift_fs::SwiftFs`] is the entry point; [`object_handle::Object`] is
//! the per-key handle it hands out.

pub mod container;
pub mod listing;
pub mod object_handle;
pub mod path;
pub mod purge;
pub mod reaper;
pub mod swift_fs;
pub mod uploader;
