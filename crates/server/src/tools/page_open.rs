//! page_open tool implementation.
//!
//! Fetches a URL through the observed transport. HTML responses are cached
//! as the current page for later scans; JSON responses from qualifying API
//! URLs are picked up by the interception pipeline as a side effect.

use chrono::Utc;
use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use capsift_client::{Request, Transport};
use capsift_core::Error;

use crate::state::AppState;

/// Input parameters for page_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageOpenParams {
    /// The URL to fetch.
    pub url: String,

    /// Optional Accept header override.
    #[serde(default)]
    pub accept: Option<String>,
}

/// Output structure for page_open tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PageOpenOutput {
    /// The original URL requested.
    pub url: String,
    /// The final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Content-Type header.
    pub content_type: Option<String>,
    /// ISO8601 timestamp of when the content was fetched.
    pub fetched_at: String,
    /// Response body size in bytes.
    pub bytes: usize,
    /// Body text, forwarded unchanged.
    pub body: String,
    /// Records captured by the interception pipeline so far.
    pub captured_records: usize,
    /// Payloads still queued for mining.
    pub pending_scans: usize,
}

/// Implementation of the page_open tool.
pub async fn open_impl(state: &AppState, params: PageOpenParams) -> Result<CallToolResult, McpError> {
    if params.url.is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let request = Request { url: params.url.clone(), accept: params.accept.clone() };
    let response = state.transport.execute(&request).await?;
    let fetched_at = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    let body = response.text();

    // HTML responses become the current page for subsequent scans.
    let is_html = response
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.to_lowercase().contains("html"));
    if is_html {
        state.remember_html(body.clone());
    }

    let output = PageOpenOutput {
        url: response.url.to_string(),
        final_url: response.final_url.to_string(),
        status: response.status.as_u16(),
        content_type: response.content_type,
        fetched_at,
        bytes: response.bytes.len(),
        body,
        captured_records: state.store.len(),
        pending_scans: state.scheduler.pending(),
    };

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}
