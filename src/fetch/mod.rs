//! Source download.
//!
//! Files are fetched one after another through an [`HttpClient`]; the first
//! failure stops the download.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use crate::config::SourceManifest;
use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let parsed = reqwest::Url::parse(url).map_err(|e| PipelineError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// Downloads every manifest source that has a URL into `data_dir`.
/// Returns the paths written.
#[tracing::instrument(skip(client, manifest), fields(data_dir = %data_dir.display()))]
pub async fn fetch_sources<C: HttpClient>(
    client: &C,
    manifest: &SourceManifest,
    data_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(data_dir)?;
    let mut written = Vec::new();

    for (name, spec) in manifest.iter() {
        let Some(url) = &spec.url else {
            warn!(source = name, "No URL configured, expecting a local file");
            continue;
        };

        let fetch_start = std::time::Instant::now();
        let bytes = fetch_bytes(client, url).await?;
        let path = spec.path(data_dir);
        std::fs::write(&path, &bytes)?;

        info!(
            source = name,
            bytes = bytes.len(),
            elapsed_ms = fetch_start.elapsed().as_millis() as u64,
            path = %path.display(),
            "Source downloaded"
        );
        written.push(path);
    }

    Ok(written)
}
