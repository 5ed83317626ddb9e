//! Capture store and debounced broadcaster.
//!
//! Records accumulate for the lifetime of the page session; insertion is
//! idempotent by URL and preserves first-seen order. Rapid-fire insertions
//! (typical of paginated API responses) collapse into a single broadcast:
//! the first accepted insert arms one debounce timer, and the whole store
//! snapshot goes out when it fires.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use capsift_core::envelope::DEFAULT_SOURCE;
use capsift_core::{Envelope, EnvelopeSender, ImageRecord};

/// Configuration for the capture store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Debounce window between the first accepted insert and the broadcast.
    pub debounce: Duration,
    /// Source id stamped on outgoing envelopes.
    pub source: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { debounce: Duration::from_millis(1_500), source: DEFAULT_SOURCE.to_string() }
    }
}

#[derive(Default)]
struct StoreState {
    records: Vec<ImageRecord>,
    seen: HashSet<String>,
    timer_pending: bool,
}

struct Inner {
    state: Mutex<StoreState>,
    tx: EnvelopeSender,
    config: StoreConfig,
}

/// Deduplicated record store on the page side of the context boundary.
#[derive(Clone)]
pub struct CaptureStore {
    inner: Arc<Inner>,
}

impl CaptureStore {
    /// Create a store broadcasting on `tx`.
    pub fn new(config: StoreConfig, tx: EnvelopeSender) -> Self {
        Self { inner: Arc::new(Inner { state: Mutex::new(StoreState::default()), tx, config }) }
    }

    /// Insert a record; returns false when its URL is already present.
    ///
    /// The first accepted insert while no timer is pending arms the debounce
    /// timer; inserts made while it is pending ride along in its broadcast.
    pub fn insert(&self, record: ImageRecord) -> bool {
        let arm_timer = {
            let mut state = self.inner.state.lock().expect("capture store poisoned");
            if state.seen.contains(&record.url) {
                return false;
            }
            state.seen.insert(record.url.clone());
            state.records.push(record);

            if state.timer_pending {
                false
            } else {
                state.timer_pending = true;
                true
            }
        };

        if arm_timer {
            let store = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(store.inner.config.debounce).await;
                store.flush().await;
            });
        }

        true
    }

    /// Broadcast the current store snapshot and disarm the timer.
    async fn flush(&self) {
        let images = {
            let mut state = self.inner.state.lock().expect("capture store poisoned");
            state.timer_pending = false;
            state.records.clone()
        };

        tracing::debug!(count = images.len(), "broadcasting capture snapshot");

        let envelope = Envelope::broadcast(self.inner.config.source.clone(), images);
        if self.inner.tx.send(envelope).await.is_err() {
            tracing::debug!("broadcast channel closed; dropping snapshot");
        }
    }

    /// Number of distinct records captured so far.
    pub fn len(&self) -> usize {
        self.inner.state.lock().expect("capture store poisoned").records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current store contents, first-seen order.
    pub fn snapshot(&self) -> Vec<ImageRecord> {
        self.inner.state.lock().expect("capture store poisoned").records.clone()
    }
}
