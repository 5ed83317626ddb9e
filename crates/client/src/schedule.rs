//! Cooperative scan scheduling.
//!
//! Mining never runs on the caller of `enqueue`: parsed payloads go into a
//! FIFO queue drained by a single background loop. Each drain slice carries
//! a time budget and the loop checkpoints and requeues itself once the
//! remaining budget drops under a small threshold, so mining never hogs the
//! executor. With budgeted draining disabled the loop instead waits a fixed
//! short delay and drains everything in one pass.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;

use crate::mine::mine;
use crate::store::CaptureStore;

/// Configuration for the scan scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time budget per drain slice; zero selects the fixed-delay fallback.
    pub slice: Duration,
    /// Remaining-budget threshold under which the loop yields.
    pub yield_threshold: Duration,
    /// Delay before the single full drain in fallback mode.
    pub fallback_delay: Duration,
    /// Maximum mining recursion depth.
    pub max_depth: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            slice: Duration::from_millis(50),
            yield_threshold: Duration::from_millis(2),
            fallback_delay: Duration::from_millis(500),
            max_depth: 8,
        }
    }
}

struct State {
    queue: VecDeque<Value>,
    draining: bool,
}

struct Inner {
    state: Mutex<State>,
    config: SchedulerConfig,
    store: CaptureStore,
}

/// FIFO mining queue with a single cooperative drain loop.
#[derive(Clone)]
pub struct ScanScheduler {
    inner: Arc<Inner>,
}

impl ScanScheduler {
    /// Create a scheduler feeding mined records into `store`.
    pub fn new(config: SchedulerConfig, store: CaptureStore) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State { queue: VecDeque::new(), draining: false }),
                config,
                store,
            }),
        }
    }

    /// Queue a parsed payload for mining. Never blocks on the mining itself.
    ///
    /// Starts the drain loop unless one is already active; enqueuing while a
    /// loop runs only grows its queue.
    pub fn enqueue(&self, value: Value) {
        let start_loop = {
            let mut state = self.inner.state.lock().expect("scan queue poisoned");
            state.queue.push_back(value);
            if state.draining {
                false
            } else {
                state.draining = true;
                true
            }
        };

        if start_loop {
            let scheduler = self.clone();
            tokio::spawn(async move {
                if scheduler.inner.config.slice.is_zero() {
                    tokio::time::sleep(scheduler.inner.config.fallback_delay).await;
                    scheduler.drain_all();
                } else {
                    scheduler.drain_slices().await;
                }
            });
        }
    }

    /// Number of payloads waiting to be mined.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().expect("scan queue poisoned").queue.len()
    }

    /// Pop the next payload, or clear the drain flag and finish.
    ///
    /// The flag is cleared under the same lock as the emptiness check so an
    /// enqueue racing with loop shutdown either lands in this loop or starts
    /// the next one; no payload can strand in between.
    fn pop_or_finish(&self) -> Option<Value> {
        let mut state = self.inner.state.lock().expect("scan queue poisoned");
        match state.queue.pop_front() {
            Some(value) => Some(value),
            None => {
                state.draining = false;
                None
            }
        }
    }

    async fn drain_slices(&self) {
        loop {
            let deadline = Instant::now() + self.inner.config.slice;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining < self.inner.config.yield_threshold {
                    break;
                }
                match self.pop_or_finish() {
                    Some(value) => self.process(&value),
                    None => return,
                }
            }
            // Budget exhausted with work left: give the executor a turn.
            tokio::task::yield_now().await;
        }
    }

    fn drain_all(&self) {
        while let Some(value) = self.pop_or_finish() {
            self.process(&value);
        }
    }

    fn process(&self, value: &Value) {
        let records = mine(value, self.inner.config.max_depth);
        if records.is_empty() {
            return;
        }
        tracing::debug!(count = records.len(), "mined records from payload");
        for record in records {
            self.inner.store.insert(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use capsift_core::envelope;
    use serde_json::json;

    fn scheduler_with(config: SchedulerConfig) -> (ScanScheduler, CaptureStore) {
        let (tx, rx) = envelope::channel(8);
        drop(rx); // broadcast side not under test; the store tolerates a closed channel
        let store = CaptureStore::new(StoreConfig::default(), tx);
        (ScanScheduler::new(config, store.clone()), store)
    }

    fn item(url: &str) -> Value {
        json!({"large_images": [{"image_url": url}]})
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_drains_into_store() {
        let (scheduler, store) = scheduler_with(SchedulerConfig::default());

        scheduler.enqueue(json!({"data": [item("https://cdn/1.jpg"), item("https://cdn/2.jpg")]}));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(store.len(), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_mode_waits_then_drains() {
        let config = SchedulerConfig { slice: Duration::ZERO, ..Default::default() };
        let (scheduler, store) = scheduler_with(config);

        scheduler.enqueue(item("https://cdn/1.jpg"));

        // Before the fallback delay elapses nothing has been mined.
        assert_eq!(scheduler.pending(), 1);
        assert!(store.is_empty());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.len(), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_during_drain_is_processed() {
        let (scheduler, store) = scheduler_with(SchedulerConfig::default());

        for i in 0..50 {
            scheduler.enqueue(item(&format!("https://cdn/{i}.jpg")));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(store.len(), 50);
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_irrelevant_payloads_are_skipped() {
        let (scheduler, store) = scheduler_with(SchedulerConfig::default());

        scheduler.enqueue(json!({}));
        scheduler.enqueue(json!(null));
        scheduler.enqueue(json!({"users": [{"name": "a"}]}));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store.is_empty());
        assert_eq!(scheduler.pending(), 0);
    }
}
