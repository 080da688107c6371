use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub images: ImagesConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Base URL of the real-time database (e.g. https://my-app-default-rtdb.firebaseio.com)
    #[serde(default)]
    pub url: String,

    /// Collection path holding the movie records
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Timeout for one-shot requests, in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_collection() -> String {
    "movies".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            collection: default_collection(),
            timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Web API key of the identity service project
    #[serde(default)]
    pub api_key: String,

    /// Identity service base URL (override for emulators and tests)
    #[serde(default = "default_auth_endpoint")]
    pub endpoint: String,

    /// Token service base URL, used to refresh expired sessions
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,

    /// Where the signed-in session is kept between runs
    /// (default: ~/.config/cinedex/session.json)
    #[serde(default)]
    pub session_path: Option<PathBuf>,
}

fn default_auth_endpoint() -> String {
    "https://identitytoolkit.googleapis.com/v1".to_string()
}

fn default_token_endpoint() -> String {
    "https://securetoken.googleapis.com/v1".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_auth_endpoint(),
            token_endpoint: default_token_endpoint(),
            session_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImagesConfig {
    #[serde(default)]
    pub cloud_name: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub api_secret: String,

    /// Upload API base URL
    #[serde(default = "default_images_base_url")]
    pub base_url: String,

    /// Upload timeout in seconds; posters can be large
    #[serde(default = "default_upload_timeout")]
    pub timeout_secs: u64,
}

fn default_images_base_url() -> String {
    "https://api.cloudinary.com".to_string()
}

fn default_upload_timeout() -> u64 {
    120
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            cloud_name: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            base_url: default_images_base_url(),
            timeout_secs: default_upload_timeout(),
        }
    }
}

impl ImagesConfig {
    /// All three credentials are present.
    pub fn is_configured(&self) -> bool {
        !self.cloud_name.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}
