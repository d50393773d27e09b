//! History storage for the evolution engine.
//!
//! This crate provides an append-only history interface with an in-memory
//! and a JSON-lines file implementation.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
pub mod memory;

pub use trait_::{HistoryStore, StorageError, Result};
pub use json_storage::JsonlHistory;
pub use memory::MemoryHistory;
