//! deep_scan tool implementation.
//!
//! Fetches every asset from the most recent quick scan and writes it to the
//! download directory, converting to PNG where the payload decodes.

use std::path::PathBuf;

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use capsift_core::Error;

use crate::save::{AssetSaver, FailedAsset, SavedAsset};
use crate::state::AppState;

/// Input parameters for deep_scan tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeepScanParams {
    /// Indices into the last quick scan result. Defaults to every entry.
    #[serde(default)]
    pub indices: Option<Vec<usize>>,

    /// Destination directory override. Defaults to the configured one.
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

/// Output structure for deep_scan tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DeepScanOutput {
    /// Entries taken from the last quick scan.
    pub requested: usize,
    /// Directory the assets were written under.
    pub download_dir: PathBuf,
    /// Assets written to disk.
    pub saved: Vec<SavedAsset>,
    /// Assets that could not be fetched or written.
    pub failed: Vec<FailedAsset>,
}

/// Implementation of the deep_scan tool.
pub async fn deep_scan_impl(state: &AppState, params: DeepScanParams) -> Result<CallToolResult, McpError> {
    let entries = state.engine.last_scan();
    if entries.is_empty() {
        return Err(Error::NoScan("run quick_scan first".into()).into());
    }

    let selected = match &params.indices {
        None => entries,
        Some(indices) => {
            let mut selected = Vec::with_capacity(indices.len());
            for &index in indices {
                let entry = entries
                    .get(index)
                    .ok_or_else(|| Error::InvalidInput(format!("index {} out of range ({} entries)", index, entries.len())))?;
                selected.push(entry.clone());
            }
            selected
        }
    };

    let download_dir = params.download_dir.unwrap_or_else(|| state.config.download_dir.clone());
    let saver = AssetSaver::new(state.transport_dyn(), download_dir.clone());
    let report = saver.save_all(&selected).await?;

    let output = DeepScanOutput {
        requested: selected.len(),
        download_dir,
        saved: report.saved,
        failed: report.failed,
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
    async fn test_deep_scan_requires_prior_scan() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let result = deep_scan_impl(&state, DeepScanParams { indices: None, download_dir: None }).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_deep_scan_rejects_out_of_range_index() {
        let state = AppState::new(AppConfig::default()).unwrap();
        state.engine.quick_scan(r#"<img src="https://cdn.ibyteimg.com/big.jpg" width="800" height="600">"#);

        let params = DeepScanParams { indices: Some(vec![0, 3]), download_dir: None };
        let result = deep_scan_impl(&state, params).await;
        assert!(result.is_err());
    }
}
