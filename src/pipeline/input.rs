//! Input resolution: load image bytes from a local path or an HTTP(S) URL.
//!
//! The scanner itself takes bytes; this module is what the CLI (or any
//! caller holding a path or link rather than an upload) uses to get them.

use crate::error::ScanError;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the image named by `input`.
pub async fn load_image(input: &str, timeout_secs: u64) -> Result<Vec<u8>, ScanError> {
    if input.trim().is_empty() {
        return Err(ScanError::NoInput);
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, ScanError> {
    let path = PathBuf::from(path_str);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(bytes)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ScanError::FileNotFound { path })
        }
        Err(e) => Err(ScanError::Internal(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Vec<u8>, ScanError> {
    info!("Downloading image from: {}", url);

    let failed = |reason: String| ScanError::DownloadFailed {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| failed(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            failed(format!("timed out after {timeout_secs}s"))
        } else {
            failed(e.to_string())
        }
    })?;

    if !response.status().is_success() {
        return Err(failed(format!("HTTP {}", response.status())));
    }

    let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;
    debug!("Downloaded {} bytes", bytes.len());
    Ok(bytes.to_vec())
}
