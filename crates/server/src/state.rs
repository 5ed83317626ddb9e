//! Shared state wiring both halves of the pipeline together.
//!
//! One `AppState` owns the observed transport, the page-side capture
//! machinery, and the correlation engine, joined by the broadcast channel.
//! Every tool call goes through this state.

use std::sync::{Arc, Mutex};

use capsift_client::{
    CaptureStore, HttpTransport, ObservedTransport, ScanScheduler, SchedulerConfig, StoreConfig,
    Transport, TransportConfig,
};
use capsift_core::envelope::{self, DEFAULT_SOURCE};
use capsift_core::{AppConfig, Error};

use crate::engine::{CorrelationEngine, EngineConfig};

/// Capacity of the capture broadcast channel.
const CHANNEL_CAPACITY: usize = 32;

pub struct AppState {
    pub config: AppConfig,
    pub transport: Arc<ObservedTransport<HttpTransport>>,
    pub store: CaptureStore,
    pub scheduler: ScanScheduler,
    pub engine: Arc<CorrelationEngine>,
    last_html: Mutex<Option<String>>,
}

impl AppState {
    /// Wire the full pipeline from configuration.
    ///
    /// Must run inside a tokio runtime; the envelope receiver task is
    /// spawned here and lives as long as the channel.
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let (tx, rx) = envelope::channel(CHANNEL_CAPACITY);

        let store = CaptureStore::new(
            StoreConfig { debounce: config.debounce(), source: DEFAULT_SOURCE.to_string() },
            tx,
        );

        let scheduler = ScanScheduler::new(
            SchedulerConfig {
                slice: config.drain_slice(),
                max_depth: config.max_mine_depth,
                ..Default::default()
            },
            store.clone(),
        );

        let http = HttpTransport::new(TransportConfig {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
        })?;
        let transport = Arc::new(ObservedTransport::new(http, scheduler.clone()));

        let engine = Arc::new(CorrelationEngine::new(EngineConfig::from_app(&config, DEFAULT_SOURCE)));
        engine.clone().spawn_receiver(rx);

        Ok(Self { config, transport, store, scheduler, engine, last_html: Mutex::new(None) })
    }

    /// The transport as a trait object, for components generic over it.
    pub fn transport_dyn(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    /// Remember the most recently opened page's HTML.
    pub fn remember_html(&self, html: String) {
        *self.last_html.lock().expect("page cache poisoned") = Some(html);
    }

    /// HTML of the most recently opened page, if any.
    pub fn last_html(&self) -> Option<String> {
        self.last_html.lock().expect("page cache poisoned").clone()
    }
}
