//! Offline-first sync layer for Sehat.
//!
//! Application code talks to [`OfflineFacade`] only. Every accepted write is
//! persisted locally and appended to the sync queue in one transaction; the
//! [`Synchronizer`] later drains the queue against a [`RemoteEndpoint`].
//!
//! # Architecture
//!
//! - **Connectivity**: [`ConnectivityMonitor`] holds the last observed
//!   online/offline state, fed by the platform.
//! - **Remote**: [`RemoteEndpoint`] delivers one mutation; [`HttpRemote`]
//!   speaks REST, [`remote::mock::MockRemote`] is scriptable for tests.
//! - **Synchronizer**: single-flight queue drain in fixed-size concurrent
//!   batches with a bounded retry count.
//! - **Scheduler**: background task firing passes on reconnect, on a fixed
//!   interval and shortly after local writes.
//!
//! ## Delivery
//!
//! 1. Read the full queue in enqueue order
//! 2. Split into batches of `batch_size`
//! 3. Dispatch a batch concurrently and wait for every outcome
//! 4. Remove delivered entries, bump the retry count of failed ones
//! 5. Dead-letter entries that reach `max_retries`
//!
//! Delivery is at-least-once; the queue entry id is sent as the request
//! identity so the backend can drop redeliveries.
//!
//! # Example
//!
//! ```
//! use sehat_store::LocalStore;
//! use sehat_sync::remote::mock::MockRemote;
//! use sehat_sync::{ConnectivityMonitor, OfflineConfig, OfflineFacade};
//! use sehat_types::RecordType;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> sehat_sync::SyncResult<()> {
//! let store = LocalStore::open_in_memory()?;
//! let remote = Arc::new(MockRemote::new());
//! let facade = OfflineFacade::new(
//!     store,
//!     remote.clone(),
//!     ConnectivityMonitor::new(true),
//!     &OfflineConfig::default(),
//! )?;
//!
//! facade.save(RecordType::Patient, "p1", json!({ "name": "Asha" })).await?;
//! assert_eq!(facade.status().await?.pending_count, 1);
//!
//! facade.force_sync().await;
//! assert_eq!(facade.status().await?.pending_count, 0);
//! # Ok(())
//! # }
//! ```

mod blocking;
mod config;
mod connectivity;
mod error;
mod facade;
pub mod http;
pub mod remote;
mod scheduler;
mod status;
mod synchronizer;

pub use config::{OfflineConfig, SyncConfig};
pub use connectivity::ConnectivityMonitor;
pub use error::{RemoteError, SyncError, SyncResult};
pub use facade::OfflineFacade;
pub use http::{HttpRemote, HttpRemoteConfig};
pub use remote::{RemoteEndpoint, RemoteMutation};
pub use scheduler::{SchedulerHandle, SyncScheduler};
pub use status::{SkipReason, SyncOutcome, SyncReport, SyncStatus};
pub use synchronizer::Synchronizer;
