//! Local durable store for the Sehat offline-first data layer.
//!
//! A single SQLite database holds four partitions:
//!
//! - `records`: domain records keyed by `(record_type, id)`, indexed by type
//! - `sync_queue`: pending mutations in enqueue order
//! - `critical_cache`: precomputed values with a timestamp index for expiry
//! - `dead_letters`: mutations dropped after exhausting their retries
//!
//! The store is opened explicitly with [`LocalStore::open`] or
//! [`LocalStore::open_in_memory`]. All methods are blocking; async callers
//! run them on the blocking pool. Once [`LocalStore::close`] has been called
//! every operation fails with [`StorageError::Unavailable`].

mod cache;
mod error;
mod queue;
mod records;
mod schema;
mod store;

pub use cache::DEFAULT_CACHE_MAX_AGE;
pub use error::{StorageError, StorageResult};
pub use store::LocalStore;
