//! MCP tool implementations.
//!
//! This module contains all tools exposed by the capsift server.

pub mod deep_scan;
pub mod page_open;
pub mod quick_scan;

pub use deep_scan::{DeepScanOutput, DeepScanParams};
pub use page_open::{PageOpenOutput, PageOpenParams};
pub use quick_scan::{QuickScanOutput, QuickScanParams};
