//! Page-context half of capsift.
//!
//! This crate provides everything that logically belongs to the page's own
//! execution context: the HTTP transport seam with its observing decorator,
//! the URL/response admission filters, the cooperative scan scheduler, the
//! recursive JSON miner, and the capture store with its debounced
//! broadcaster.

pub mod mine;
pub mod net;
pub mod schedule;
pub mod store;

pub use mine::mine;
pub use net::{HttpTransport, ObservedTransport, Request, Response, Transport, TransportConfig};
pub use schedule::{ScanScheduler, SchedulerConfig};
pub use store::{CaptureStore, StoreConfig};
