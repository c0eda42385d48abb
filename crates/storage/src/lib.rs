//! Progress persistence for Syllabus.
//!
//! This crate provides a key/value backend abstraction with JSON directory
//! and in-memory implementations, and the progress store that maps learner
//! progress onto it.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;
pub mod progress_store;

pub use trait_::{KvBackend, StorageError, Result};
pub use json_storage::{validate_key, JsonDirBackend};
pub use memory::MemoryBackend;
pub use progress_store::{EphemeralStore, KvProgressStore, ProgressStore, StoreConfig, RECORD_VERSION};
