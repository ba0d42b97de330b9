//! Core data models for the Swift file system adapter.
//!
//! These types describe what the store reports (containers, objects,
//! headers) and how large objects are laid out in it. Directory entries
//! synthesized from listings live in [`entry`].

pub mod container;
pub mod entry;
pub mod metadata;
pub mod object;
pub mod segment;
