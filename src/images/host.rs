//! Remote image hosting.

use std::time::Duration;

use async_trait::async_trait;
use cinedex_common::{Error, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::ImagesConfig;

/// A stored image as reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Public URL, always `https://`.
    pub url: String,
    pub public_id: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub format: Option<String>,
    pub bytes: Option<u64>,
}

/// Somewhere images can be uploaded to.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Store `data` under `public_id`. `file_name` is passed along as the
    /// original name of the upload.
    async fn upload(&self, public_id: &str, file_name: &str, data: Vec<u8>) -> Result<UploadedImage>;
}

/// Upgrade a plain `http://` URL to `https://`; anything else is unchanged.
pub fn secure_url(url: &str) -> String {
    match url.strip_prefix("http://") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Sign request parameters: SHA-256 over `k1=v1&k2=v2...` (keys sorted)
/// followed by the API secret, hex encoded.
pub fn sign(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    public_id: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    secure_url: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    bytes: Option<u64>,
}

/// Signed uploads to Cloudinary.
pub struct CloudinaryHost {
    client: Client,
    base_url: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryHost {
    pub fn new(config: &ImagesConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/v1_1/{}/image/upload", self.base_url, self.cloud_name)
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(&self, public_id: &str, file_name: &str, data: Vec<u8>) -> Result<UploadedImage> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = sign(
            &[("public_id", public_id), ("timestamp", &timestamp)],
            &self.api_secret,
        );

        let size = data.len();
        let form = Form::new()
            .part("file", Part::bytes(data).file_name(file_name.to_string()))
            .text("api_key", self.api_key.clone())
            .text("public_id", public_id.to_string())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        debug!(public_id, size, "Uploading image");
        let resp = self
            .client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::network(format!("image upload failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::network(format!("unreadable upload response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| {
                    v.pointer("/error/message")
                        .and_then(Value::as_str)
                        .map(String::from)
                })
                .unwrap_or(body);
            return Err(Error::backend(status.as_u16(), message));
        }

        let parsed: UploadResponse = serde_json::from_str(&body)?;
        let url = parsed
            .url
            .or(parsed.secure_url)
            .ok_or_else(|| Error::internal("upload response carried no URL"))?;

        Ok(UploadedImage {
            url: secure_url(&url),
            public_id: parsed.public_id,
            width: parsed.width,
            height: parsed.height,
            format: parsed.format,
            bytes: parsed.bytes,
        })
    }
}
