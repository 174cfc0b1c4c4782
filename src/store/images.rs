use super::{object_key, ImageStore};
use crate::error::ScanError;
use crate::pipeline::encode::ImageKind;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stores images as files under `root/<folder>/<uuid>.<ext>`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(
        &self,
        image: &[u8],
        kind: ImageKind,
        folder: &str,
    ) -> Result<String, ScanError> {
        let storage = |e: std::io::Error| ScanError::Storage {
            detail: e.to_string(),
        };

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await.map_err(storage)?;

        // Atomic write: temp file in the same directory, then rename.
        let path = dir.join(object_key(kind));
        let tmp_path = path.with_extension("part");
        tokio::fs::write(&tmp_path, image).await.map_err(storage)?;
        tokio::fs::rename(&tmp_path, &path).await.map_err(storage)?;

        let abs = std::path::absolute(&path).map_err(storage)?;
        debug!("Stored {} bytes at {}", image.len(), abs.display());
        Ok(format!("file://{}", abs.display()))
    }
}

/// Uploads images with an HTTP `PUT` to `{upload_base}/{folder}/{key}`.
///
/// Works with any endpoint that accepts raw-body PUTs (S3-compatible
/// gateways, MinIO behind a proxy, a CDN origin). The returned URL is
/// `{public_base}/{folder}/{key}`, which lets uploads go through an
/// authenticated origin while reads use a public host.
#[derive(Debug, Clone)]
pub struct HttpImageStore {
    client: reqwest::Client,
    upload_base: String,
    public_base: String,
    bearer_token: Option<String>,
}

impl HttpImageStore {
    pub fn new(upload_base: impl Into<String>) -> Self {
        let upload_base = trim_base(upload_base.into());
        Self {
            client: reqwest::Client::new(),
            public_base: upload_base.clone(),
            upload_base,
            bearer_token: None,
        }
    }

    pub fn with_public_base(mut self, public_base: impl Into<String>) -> Self {
        self.public_base = trim_base(public_base.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }
}

fn trim_base(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(
        &self,
        image: &[u8],
        kind: ImageKind,
        folder: &str,
    ) -> Result<String, ScanError> {
        let key = object_key(kind);
        let upload_url = format!("{}/{}/{}", self.upload_base, folder, key);

        let mut request = self
            .client
            .put(&upload_url)
            .header(CONTENT_TYPE, kind.mime_type())
            .body(image.to_vec());
        if let Some(ref token) = self.bearer_token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await.map_err(|e| ScanError::Storage {
            detail: e.to_string(),
        })?;
        if !response.status().is_success() {
            return Err(ScanError::Storage {
                detail: format!("HTTP {} from {}", response.status(), upload_url),
            });
        }

        info!("Uploaded {} bytes to {}", image.len(), upload_url);
        Ok(format!("{}/{}/{}", self.public_base, folder, key))
    }
}
