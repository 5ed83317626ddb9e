//! Core types and shared functionality for capsift.
//!
//! This crate provides:
//! - The image record and scan entry data model
//! - URL fingerprint extraction and the fingerprint index
//! - The typed cross-context envelope and its channel
//! - Unified error types
//! - Configuration structures

pub mod config;
pub mod envelope;
pub mod error;
pub mod fingerprint;
pub mod record;

pub use config::AppConfig;
pub use envelope::{Envelope, INTERCEPTOR_KIND};
pub use envelope::{EnvelopeReceiver, EnvelopeSender};
pub use error::Error;
pub use fingerprint::{FingerprintIndex, fingerprint};
pub use record::{ImageRecord, ScanEntry};
