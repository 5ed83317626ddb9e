//! quick_scan tool implementation.
//!
//! Runs a correlation pass over a DOM snapshot against everything the
//! interception pipeline has captured so far.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use capsift_core::{Error, ScanEntry};

use crate::state::AppState;

/// Input parameters for quick_scan tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuickScanParams {
    /// HTML to scan. Defaults to the page from the last page_open call.
    #[serde(default)]
    pub html: Option<String>,
}

/// Output structure for quick_scan tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuickScanOutput {
    /// Total assets found.
    pub total: usize,
    /// How many resolved to a captured full-resolution URL.
    pub high_res: usize,
    /// Records available for correlation at scan time.
    pub captured_records: usize,
    /// The scan result, document order, deduplicated by chosen URL.
    pub images: Vec<ScanEntry>,
}

/// Implementation of the quick_scan tool.
pub async fn scan_impl(state: &AppState, params: QuickScanParams) -> Result<CallToolResult, McpError> {
    let html = match params.html {
        Some(html) if !html.is_empty() => html,
        Some(_) => return Err(Error::InvalidInput("html cannot be empty".into()).into()),
        None => state
            .last_html()
            .ok_or_else(|| Error::InvalidInput("no page available; pass html or call page_open first".into()))?,
    };

    let entries = state.engine.quick_scan(&html);
    let high_res = entries.iter().filter(|e| e.is_high_res).count();

    let output = QuickScanOutput {
        total: entries.len(),
        high_res,
        captured_records: state.engine.records_len(),
        images: entries,
    };

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsift_core::AppConfig;

    #[tokio::test]
    async fn test_scan_without_page_or_html() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let result = scan_impl(&state, QuickScanParams { html: None }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_scan_empty_html_rejected() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let result = scan_impl(&state, QuickScanParams { html: Some("".into()) }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_scan_explicit_html() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let html = r#"<img src="https://cdn.ibyteimg.com/big.jpg" width="800" height="600">"#;
        let result = scan_impl(&state, QuickScanParams { html: Some(html.into()) }).await.unwrap();

        let text = result.content[0].as_text().expect("expected text content").text.clone();
        let output: QuickScanOutput = serde_json::from_str(&text).unwrap();
        assert_eq!(output.total, 1);
        assert_eq!(output.high_res, 0);
        assert_eq!(output.images.len(), 1);
        assert_eq!(output.images[0].backup, "https://cdn.ibyteimg.com/big.jpg");

        // The wire shape carries the scan result under "images".
        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(raw.get("images").is_some_and(|v| v.is_array()));
    }

    #[tokio::test]
    async fn test_scan_uses_remembered_page() {
        let state = AppState::new(AppConfig::default()).unwrap();
        state.remember_html(r#"<img src="https://cdn.ibyteimg.com/big.jpg" width="800">"#.into());

        let result = scan_impl(&state, QuickScanParams { html: None }).await;
        assert!(result.is_ok());
    }
}
