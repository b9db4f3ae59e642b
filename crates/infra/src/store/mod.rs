//! Keyed record storage used by the directory and override stores.

pub mod record_store;

pub use record_store::{InMemoryRecordStore, RecordStore};
