//! Image upload gateway used when adding or editing a movie poster.

use std::path::Path;
use std::sync::Arc;

use cinedex_common::{Error, Result};

use super::host::{secure_url, ImageHost, UploadedImage};

/// Public id used when the file name yields nothing usable.
pub const FALLBACK_PUBLIC_ID: &str = "uploaded_image";

/// Uploads local images to the configured [`ImageHost`].
#[derive(Clone)]
pub struct ImageGateway {
    host: Arc<dyn ImageHost>,
}

impl ImageGateway {
    pub fn new(host: Arc<dyn ImageHost>) -> Self {
        Self { host }
    }

    /// Display name of the file at `path`, or `None` if it is not a
    /// readable regular file.
    pub async fn resolve_file_name(&self, path: &Path) -> Option<String> {
        let meta = tokio::fs::metadata(path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        path.file_name().map(|n| n.to_string_lossy().into_owned())
    }

    /// Upload the image at `path` and return its `https://` URL.
    ///
    /// Failures are logged and reported as `None`; use
    /// [`upload_detailed`](Self::upload_detailed) to get the error.
    pub async fn upload(&self, path: &Path) -> Option<String> {
        match self.upload_detailed(path).await {
            Ok(image) => Some(image.url),
            Err(e) => {
                tracing::error!(path = ?path, error = %e, "Image upload failed");
                None
            }
        }
    }

    /// Upload the image at `path`, reporting what went wrong on failure.
    pub async fn upload_detailed(&self, path: &Path) -> Result<UploadedImage> {
        let data = tokio::fs::read(path).await?;
        let file_name = self
            .resolve_file_name(path)
            .await
            .unwrap_or_else(|| FALLBACK_PUBLIC_ID.to_string());
        let public_id = public_id_for(path);

        let host = self.host.clone();
        let task_id = public_id.clone();
        let mut image = tokio::spawn(async move { host.upload(&task_id, &file_name, data).await })
            .await
            .map_err(|e| Error::internal(format!("upload task failed: {e}")))??;

        image.url = secure_url(&image.url);
        tracing::info!(public_id = %public_id, url = %image.url, "Uploaded image");
        Ok(image)
    }
}

/// File name without its extension, or [`FALLBACK_PUBLIC_ID`].
pub fn public_id_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_PUBLIC_ID.to_string())
}
