//! Typed cross-context broadcast envelope.
//!
//! The capture side and the correlation side are two independently owned
//! halves joined only by this channel. Delivery is asynchronous and
//! best-effort: an envelope still in flight when the process shuts down is
//! simply lost, and nothing orders envelopes against unrelated activity.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::record::ImageRecord;

/// Message kind tag carried by capture broadcasts.
pub const INTERCEPTOR_KIND: &str = "CAPCUT_INTERCEPTOR_DATA";

/// Source id used when both halves run in the same process.
pub const DEFAULT_SOURCE: &str = "capsift-page";

/// One broadcast from the capture store to the correlation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Identifies the originating page context. Receivers drop envelopes
    /// from any other source.
    pub source: String,
    /// Message kind; receivers drop anything but [`INTERCEPTOR_KIND`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Full snapshot of the capture store at broadcast time.
    pub images: Vec<ImageRecord>,
}

impl Envelope {
    /// Create a capture broadcast envelope.
    pub fn broadcast(source: impl Into<String>, images: Vec<ImageRecord>) -> Self {
        Self { source: source.into(), kind: INTERCEPTOR_KIND.to_string(), images }
    }

    /// Whether a receiver bound to `own_source` should process this envelope.
    pub fn accepted_by(&self, own_source: &str) -> bool {
        self.source == own_source && self.kind == INTERCEPTOR_KIND
    }
}

/// Sending half of the cross-context channel.
pub type EnvelopeSender = mpsc::Sender<Envelope>;

/// Receiving half of the cross-context channel.
pub type EnvelopeReceiver = mpsc::Receiver<Envelope>;

/// Create the cross-context channel.
pub fn channel(capacity: usize) -> (EnvelopeSender, EnvelopeReceiver) {
    mpsc::channel(capacity)
}
