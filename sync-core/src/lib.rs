//! # sync-core
//!
//! Pure logic for the 0k-Sync folder index (no I/O, instant tests).
//!
//! This crate implements the bookkeeping that sits underneath a folder
//! index without touching storage, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no storage)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about concurrent access
//!
//! The storage side (records, global views, block maps) lives in
//! `sync-index`, which drives these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cursor;
pub mod path;
pub mod size;

pub use cursor::{max_cursor, HighWaterMarks, LocalCursor};
pub use path::{native_filename, normalized_filename};
pub use size::{Counts, SizeTracker};
