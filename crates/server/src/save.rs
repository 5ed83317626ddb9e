//! Fetching and persisting scanned assets.
//!
//! Each scan entry is fetched through the shared transport, re-encoded to
//! PNG when the payload decodes as an image, and written under the
//! configured download directory with a collision-free name. A failed fetch
//! of the chosen URL falls back once to the entry's backup URL.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use image::ImageFormat;
use serde::Serialize;

use capsift_client::{Request, Transport};
use capsift_core::{Error, ScanEntry};

/// One asset written to disk.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct SavedAsset {
    /// URL the bytes were actually fetched from.
    pub url: String,
    /// Path the asset was written to.
    pub path: PathBuf,
    /// Size on disk in bytes.
    pub bytes: usize,
    /// Whether the payload was re-encoded to PNG.
    pub converted: bool,
}

/// One asset that could not be saved.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct FailedAsset {
    /// The entry's chosen URL.
    pub url: String,
    /// What went wrong.
    pub error: String,
}

/// Outcome of saving a full scan result.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
pub struct SaveReport {
    pub saved: Vec<SavedAsset>,
    pub failed: Vec<FailedAsset>,
}

/// Fetches scan entries and writes them to the download directory.
pub struct AssetSaver {
    transport: Arc<dyn Transport>,
    download_dir: PathBuf,
}

impl AssetSaver {
    pub fn new(transport: Arc<dyn Transport>, download_dir: impl Into<PathBuf>) -> Self {
        Self { transport, download_dir: download_dir.into() }
    }

    /// Save every entry of a scan result; per-entry failures are collected,
    /// never fatal for the batch.
    pub async fn save_all(&self, entries: &[ScanEntry]) -> Result<SaveReport, Error> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| Error::SaveFailed(format!("cannot create {}: {}", self.download_dir.display(), e)))?;

        let batch = Utc::now().timestamp_millis();
        let mut report = SaveReport { saved: Vec::new(), failed: Vec::new() };

        for (index, entry) in entries.iter().enumerate() {
            match self.save_entry(entry, batch, index).await {
                Ok(saved) => report.saved.push(saved),
                Err(e) => {
                    tracing::warn!(url = %entry.url, error = %e, "asset save failed");
                    report.failed.push(FailedAsset { url: entry.url.clone(), error: e.to_string() });
                }
            }
        }

        tracing::info!(saved = report.saved.len(), failed = report.failed.len(), "save batch complete");
        Ok(report)
    }

    async fn save_entry(&self, entry: &ScanEntry, batch: i64, index: usize) -> Result<SavedAsset, Error> {
        let (url, bytes) = self.fetch_with_fallback(entry).await?;

        // Normalize to PNG when the payload decodes; otherwise keep the
        // bytes untouched under their original extension.
        let (data, extension, converted) = match reencode_png(bytes.clone()).await {
            Ok(png) => (png, "png", true),
            Err(e) => {
                tracing::debug!(url = %url, error = %e, "keeping original encoding");
                (bytes, sniff_extension(&url), false)
            }
        };

        let name = format!("capcut_{}_{}.{}", batch, index, extension);
        let path = uniquify(&self.download_dir.join(name)).await;

        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| Error::SaveFailed(format!("cannot write {}: {}", path.display(), e)))?;

        tracing::debug!(path = %path.display(), bytes = data.len(), converted, "asset saved");
        Ok(SavedAsset { url, path, bytes: data.len(), converted })
    }

    /// Fetch the chosen URL, retrying once against the backup when the
    /// chosen one errors or comes back non-2xx. The backup is skipped when
    /// it is the same URL.
    async fn fetch_with_fallback(&self, entry: &ScanEntry) -> Result<(String, Vec<u8>), Error> {
        let primary = self.fetch_ok(&entry.url).await;
        match primary {
            Ok(bytes) => Ok((entry.url.clone(), bytes)),
            Err(e) if entry.backup != entry.url => {
                tracing::debug!(url = %entry.url, error = %e, "falling back to backup URL");
                let bytes = self.fetch_ok(&entry.backup).await?;
                Ok((entry.backup.clone(), bytes))
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_ok(&self, url: &str) -> Result<Vec<u8>, Error> {
        let response = self.transport.execute(&Request::get(url)).await?;
        if !response.status.is_success() {
            return Err(Error::HttpError(format!("{} returned {}", url, response.status)));
        }
        Ok(response.bytes.to_vec())
    }
}

/// Re-encode any decodable image to PNG on the blocking pool.
async fn reencode_png(data: Vec<u8>) -> Result<Vec<u8>, Error> {
    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&data)
            .map_err(|e| Error::SaveFailed(format!("decode failed: {}", e)))?;
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)
            .map_err(|e| Error::SaveFailed(format!("PNG encode failed: {}", e)))?;
        Ok(out.into_inner())
    })
    .await
    .map_err(|e| Error::SaveFailed(format!("encode task failed: {}", e)))?
}

/// Extension for undecodable payloads, taken from the URL when it carries a
/// recognized image suffix.
fn sniff_extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    for ext in ["jpg", "jpeg", "webp"] {
        if path.ends_with(&format!(".{}", ext)) {
            return ext;
        }
    }
    "png"
}

/// First free variant of `path`, appending ` (n)` before the extension when
/// the name is already taken.
async fn uniquify(path: &Path) -> PathBuf {
    if !matches!(tokio::fs::try_exists(path).await, Ok(true)) {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("asset");
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("png");
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    for n in 1.. {
        let candidate = dir.join(format!("{} ({}).{}", stem, n, ext));
        if !matches!(tokio::fs::try_exists(&candidate).await, Ok(true)) {
            return candidate;
        }
    }
    unreachable!()
}
