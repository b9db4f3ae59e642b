//! Infrastructure layer: in-process stores, the access-control container and
//! durable flag storage.

pub mod access;
pub mod directory;
pub mod flags;
pub mod overrides;
pub mod persist;
pub mod store;

pub use access::{AccessControl, AccessSnapshot};
pub use directory::UserDirectory;
pub use flags::{FlagStore, FlagStoreError, InMemoryFlagStore, JsonFileFlagStore};
pub use overrides::OverrideStore;
pub use store::{InMemoryRecordStore, RecordStore};
