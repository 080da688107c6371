//! Shared test harness for integration tests.
//!
//! [`TestHarness`] wires an in-memory store, the movie repository, in-memory
//! accounts and an image gateway whose host is a mock upload API.

#![allow(dead_code)]

use std::sync::Arc;

use cinedex::auth::InMemoryAuth;
use cinedex::config::ImagesConfig;
use cinedex::images::{CloudinaryHost, ImageGateway};
use cinedex_store::memory::MemoryStore;
use cinedex_store::repository::MovieRepository;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLOUD_NAME: &str = "demo";

pub struct TestHarness {
    pub store: Arc<MemoryStore>,
    pub repo: MovieRepository,
    pub auth: Arc<InMemoryAuth>,
    pub images: ImageGateway,
    pub image_server: MockServer,
}

impl TestHarness {
    /// Harness whose upload API accepts every image.
    pub async fn new() -> Self {
        let image_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/v1_1/{CLOUD_NAME}/image/upload")))
            .respond_with(ResponseTemplate::new(200).set_body_json(upload_response("poster")))
            .mount(&image_server)
            .await;

        let store = Arc::new(MemoryStore::new());
        let repo = MovieRepository::new(store.clone());
        let images = ImageGateway::new(Arc::new(CloudinaryHost::new(&images_config(
            &image_server.uri(),
        ))));

        Self {
            store,
            repo,
            auth: Arc::new(InMemoryAuth::new()),
            images,
            image_server,
        }
    }
}

pub fn images_config(base_url: &str) -> ImagesConfig {
    ImagesConfig {
        cloud_name: CLOUD_NAME.to_string(),
        api_key: "123456".to_string(),
        api_secret: "topsecret".to_string(),
        base_url: base_url.to_string(),
        timeout_secs: 5,
    }
}

/// What the upload API answers for `public_id`; the `url` is plain http.
pub fn upload_response(public_id: &str) -> serde_json::Value {
    json!({
        "public_id": public_id,
        "version": 1700000000,
        "width": 600,
        "height": 900,
        "format": "jpg",
        "resource_type": "image",
        "bytes": 4,
        "url": format!("http://res.cloudinary.com/{CLOUD_NAME}/image/upload/v1700000000/{public_id}.jpg"),
        "secure_url": format!("https://res.cloudinary.com/{CLOUD_NAME}/image/upload/v1700000000/{public_id}.jpg"),
    })
}

/// Write a small file named `name` into a fresh temp dir.
pub fn poster_file(name: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(name);
    std::fs::write(&path, b"\xFF\xD8\xFF\xE0").unwrap();
    (dir, path)
}
