//! Remote endpoint abstraction.
//!
//! The synchronizer only needs one operation from the backend: deliver a
//! single mutation and report success or failure. Concrete protocols plug
//! in by implementing [`RemoteEndpoint`].
//!
//! Delivery is at-least-once. A request whose acknowledgement is lost is
//! retried and may be applied twice unless the backend de-duplicates on
//! [`RemoteMutation::request_id`].

use crate::error::{RemoteError, SyncResult};
use async_trait::async_trait;
use sehat_types::{QueueEntryId, RecordType, SyncAction, SyncQueueEntry};
use serde::Serialize;

/// One queued mutation in the form sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteMutation {
    /// The queue entry id, stable across retries.
    pub request_id: QueueEntryId,
    pub action: SyncAction,
    pub record_type: RecordType,
    pub record_id: String,
    /// Untagged JSON payload.
    pub body: String,
}

impl RemoteMutation {
    /// Builds the wire form of a queue entry.
    pub fn from_entry(entry: &SyncQueueEntry) -> SyncResult<Self> {
        Ok(Self {
            request_id: entry.entry_id,
            action: entry.action,
            record_type: entry.record_type(),
            record_id: entry.record_id.clone(),
            body: serde_json::to_string(entry.payload.data())?,
        })
    }
}

/// A backend that accepts queued mutations.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Delivers one mutation. `Ok(())` means the backend has durably
    /// accepted it.
    async fn deliver(&self, mutation: &RemoteMutation) -> Result<(), RemoteError>;
}

/// A scriptable in-memory endpoint for testing.
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::watch;

    /// Records every call and fails the ones it has been told to fail.
    #[derive(Debug)]
    pub struct MockRemote {
        calls: Mutex<Vec<RemoteMutation>>,
        delivered: Mutex<Vec<RemoteMutation>>,
        always_fail: Mutex<HashSet<String>>,
        fail_times: Mutex<HashMap<String, u32>>,
        fail_all: AtomicBool,
        delay: Mutex<Option<Duration>>,
        paused: watch::Sender<bool>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl Default for MockRemote {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockRemote {
        /// Creates an endpoint that accepts everything.
        pub fn new() -> Self {
            let (paused, _) = watch::channel(false);
            Self {
                calls: Mutex::new(Vec::new()),
                delivered: Mutex::new(Vec::new()),
                always_fail: Mutex::new(HashSet::new()),
                fail_times: Mutex::new(HashMap::new()),
                fail_all: AtomicBool::new(false),
                delay: Mutex::new(None),
                paused,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        /// Every call for `record_id` fails.
        pub fn fail_record(&self, record_id: impl Into<String>) {
            self.always_fail.lock().unwrap().insert(record_id.into());
        }

        /// The next `times` calls for `record_id` fail, later ones succeed.
        pub fn fail_record_times(&self, record_id: impl Into<String>, times: u32) {
            self.fail_times.lock().unwrap().insert(record_id.into(), times);
        }

        /// Every call fails while set.
        pub fn set_fail_all(&self, fail: bool) {
            self.fail_all.store(fail, Ordering::SeqCst);
        }

        /// Each call takes `delay` before answering.
        pub fn set_delay(&self, delay: Option<Duration>) {
            *self.delay.lock().unwrap() = delay;
        }

        /// Holds every call (after it is recorded) until [`Self::resume`].
        pub fn pause(&self) {
            self.paused.send_replace(true);
        }

        /// Releases held calls.
        pub fn resume(&self) {
            self.paused.send_replace(false);
        }

        /// Every call received, in arrival order.
        pub fn calls(&self) -> Vec<RemoteMutation> {
            self.calls.lock().unwrap().clone()
        }

        /// Calls that succeeded, in completion order.
        pub fn delivered(&self) -> Vec<RemoteMutation> {
            self.delivered.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        /// Calls currently awaiting an answer.
        pub fn in_flight(&self) -> usize {
            self.in_flight.load(Ordering::SeqCst)
        }

        /// Highest number of simultaneous calls seen.
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        /// Yields until at least `n` calls are in flight.
        pub async fn wait_for_in_flight(&self, n: usize) {
            while self.in_flight() < n {
                tokio::task::yield_now().await;
            }
        }

        fn should_fail(&self, record_id: &str) -> bool {
            if self.fail_all.load(Ordering::SeqCst) {
                return true;
            }
            if self.always_fail.lock().unwrap().contains(record_id) {
                return true;
            }
            let mut remaining = self.fail_times.lock().unwrap();
            match remaining.get_mut(record_id) {
                Some(n) if *n > 0 => {
                    *n -= 1;
                    true
                }
                _ => false,
            }
        }
    }

    #[async_trait]
    impl RemoteEndpoint for MockRemote {
        fn name(&self) -> &str {
            "mock"
        }

        async fn deliver(&self, mutation: &RemoteMutation) -> Result<(), RemoteError> {
            self.calls.lock().unwrap().push(mutation.clone());
            let fail = self.should_fail(&mutation.record_id);

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let mut paused = self.paused.subscribe();
            let _ = paused.wait_for(|p| !*p).await;
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            if fail {
                return Err(RemoteError::Network(format!(
                    "mock failure for {} {}",
                    mutation.record_type, mutation.record_id
                )));
            }
            self.delivered.lock().unwrap().push(mutation.clone());
            Ok(())
        }
    }
}
