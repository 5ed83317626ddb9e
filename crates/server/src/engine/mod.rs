//! The correlation engine: isolated-context half of capsift.
//!
//! Receives capture broadcasts, keeps its own deduplicated record store
//! (explicitly independent from the page-side store; the two share nothing
//! but the channel), and on demand walks a DOM snapshot deciding for each
//! visible image whether a captured full-resolution URL substitutes for it.

pub mod dom;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use capsift_core::envelope::DEFAULT_SOURCE;
use capsift_core::{AppConfig, Envelope, EnvelopeReceiver, FingerprintIndex, ImageRecord, ScanEntry};

use dom::{Candidate, collect_candidates};

/// Correlation thresholds and identity.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Host substring a candidate source URL must contain.
    pub target_host: String,
    /// Icon-size bar; one dimension must strictly exceed this.
    pub min_card_px: u32,
    /// Junk bar applied to unmatched candidates only.
    pub junk_px: u32,
    /// Own source id; envelopes from any other source are dropped.
    pub source: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default(), DEFAULT_SOURCE)
    }
}

impl EngineConfig {
    /// Derive the engine thresholds from the application configuration.
    pub fn from_app(config: &AppConfig, source: impl Into<String>) -> Self {
        Self {
            target_host: config.target_host.clone(),
            min_card_px: config.min_card_px,
            junk_px: config.junk_px,
            source: source.into(),
        }
    }
}

#[derive(Default)]
struct MergedStore {
    records: Vec<ImageRecord>,
    seen: HashSet<String>,
}

/// Isolated-context record store plus the scan operations over it.
pub struct CorrelationEngine {
    store: Mutex<MergedStore>,
    last_scan: Mutex<Vec<ScanEntry>>,
    config: EngineConfig,
}

impl CorrelationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { store: Mutex::new(MergedStore::default()), last_scan: Mutex::new(Vec::new()), config }
    }

    /// Merge one broadcast into the store; returns the number of newly
    /// accepted records. Foreign or mistyped envelopes merge nothing.
    pub fn merge(&self, envelope: &Envelope) -> usize {
        if !envelope.accepted_by(&self.config.source) {
            tracing::debug!(source = %envelope.source, kind = %envelope.kind, "ignoring foreign envelope");
            return 0;
        }

        let mut store = self.store.lock().expect("record store poisoned");
        let mut accepted = 0;
        for record in &envelope.images {
            if store.seen.insert(record.url.clone()) {
                store.records.push(record.clone());
                accepted += 1;
            }
        }
        accepted
    }

    /// Drive envelope merging off the cross-context channel until it closes.
    pub fn spawn_receiver(self: Arc<Self>, mut rx: EnvelopeReceiver) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let accepted = self.merge(&envelope);
                tracing::debug!(accepted, total = self.records_len(), "merged capture broadcast");
            }
            tracing::debug!("capture channel closed");
        })
    }

    /// Number of records merged so far.
    pub fn records_len(&self) -> usize {
        self.store.lock().expect("record store poisoned").records.len()
    }

    /// The most recent quick-scan result (empty before the first scan).
    pub fn last_scan(&self) -> Vec<ScanEntry> {
        self.last_scan.lock().expect("scan cache poisoned").clone()
    }

    /// Run a full correlation pass over a DOM snapshot.
    ///
    /// Synchronous to completion; always returns a (possibly empty) result.
    pub fn quick_scan(&self, html: &str) -> Vec<ScanEntry> {
        let index = {
            let store = self.store.lock().expect("record store poisoned");
            tracing::info!(records = store.records.len(), "quick scan starting");
            FingerprintIndex::build(store.records.iter())
        };

        let result = self.correlate(collect_candidates(html), &index);
        tracing::info!(assets = result.len(), "quick scan complete");

        *self.last_scan.lock().expect("scan cache poisoned") = result.clone();
        result
    }

    fn correlate(&self, candidates: Vec<Candidate>, index: &FingerprintIndex) -> Vec<ScanEntry> {
        let mut entries: Vec<ScanEntry> = Vec::new();
        let mut slot: HashMap<String, usize> = HashMap::new();

        for candidate in candidates {
            if !candidate.src.contains(&self.config.target_host) {
                continue;
            }

            // Icons and navigation chrome sit at or below the card bar.
            let big_enough =
                candidate.width > self.config.min_card_px || candidate.height > self.config.min_card_px;
            if !big_enough {
                continue;
            }

            if candidate.avatar {
                continue;
            }

            let (url, is_high_res) = match index.resolve(&candidate.src) {
                Some(full) => (full.to_string(), true),
                None => (candidate.src.clone(), false),
            };

            // An unmatched small image is far more likely page furniture
            // than a missed asset; only matched ones get the benefit of
            // the doubt below the junk bar.
            if !is_high_res && candidate.width < self.config.junk_px && candidate.height < self.config.junk_px {
                continue;
            }

            let entry = ScanEntry { url: url.clone(), backup: candidate.src, dom_index: candidate.dom_index, is_high_res };

            // Dedup by chosen URL: last occurrence wins, first-insertion
            // order is kept.
            match slot.get(&url) {
                Some(&at) => entries[at] = entry,
                None => {
                    slot.insert(url, entries.len());
                    entries.push(entry);
                }
            }
        }

        entries
    }
}
