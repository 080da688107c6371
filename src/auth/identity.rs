//! Identity toolkit REST client.
//!
//! Password sign-in and sign-up go to `<endpoint>/accounts:*?key=<api key>`;
//! refreshing an expired id token goes to `<token_endpoint>/token`. Failures
//! come back as `{"error": {"code": 400, "message": "EMAIL_EXISTS"}}`, and
//! the message code is mapped to something a user can act on.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use cinedex_common::{Error, Result, UserId};
use parking_lot::RwLock;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{messages, validate_credentials, AuthProvider, Session, SessionStore};
use crate::config::AuthConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    SignIn,
    SignUp,
    Refresh,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    email: String,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    user_id: String,
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

/// Client for the hosted identity service.
pub struct IdentityClient {
    client: Client,
    endpoint: String,
    token_endpoint: String,
    api_key: String,
    session: RwLock<Option<Session>>,
    persist: Option<SessionStore>,
}

impl IdentityClient {
    pub fn new(config: &AuthConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });

        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token_endpoint: config.token_endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            session: RwLock::new(None),
            persist: None,
        }
    }

    /// Keep the session in `store`, starting from whatever it holds now.
    pub fn with_session_store(mut self, store: SessionStore) -> Self {
        match store.load() {
            Ok(session) => *self.session.get_mut() = session,
            Err(e) => {
                warn!(path = ?store.path(), error = %e, "Discarding unreadable session file");
                let _ = store.clear();
            }
        }
        self.persist = Some(store);
        self
    }

    /// Exchange the refresh token for a new id token.
    pub async fn refresh(&self) -> Result<Session> {
        let current = self
            .current_session()
            .ok_or_else(|| Error::Unauthorized(messages::NOT_SIGNED_IN.to_string()))?;

        let url = format!("{}/token", self.token_endpoint);
        debug!(user = %current.user_id, "Refreshing id token");
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::network(format!("token refresh failed: {e}")))?;

        let body: RefreshResponse = read_json(resp, Op::Refresh).await?;
        let session = Session {
            user_id: UserId::new(body.user_id),
            email: current.email,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expires_at(body.expires_in.as_deref()),
        };
        self.store_session(&session);
        Ok(session)
    }

    /// The current session, refreshed first when it is about to expire.
    pub async fn fresh_session(&self) -> Result<Option<Session>> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };

        let deadline = Utc::now() + chrono::Duration::seconds(EXPIRY_MARGIN_SECS);
        if session.expires_at > deadline {
            return Ok(Some(session));
        }

        match self.refresh().await {
            Ok(session) => Ok(Some(session)),
            Err(e @ Error::Unauthorized(_)) => {
                warn!(error = %e, "Stored session can no longer be refreshed");
                self.sign_out()?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn account_request(&self, method: &str, op: Op, email: &str, password: &str) -> Result<Session> {
        validate_credentials(email, password)?;

        let url = format!("{}/accounts:{}", self.endpoint, method);
        debug!(method, "Identity request");
        let resp = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "email": email.trim(),
                "password": password,
                "returnSecureToken": true,
            }))
            .send()
            .await
            .map_err(|e| Error::network(format!("{method} failed: {e}")))?;

        let body: AccountResponse = read_json(resp, op).await?;
        let session = Session {
            user_id: UserId::new(body.local_id),
            email: body.email,
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expires_at(body.expires_in.as_deref()),
        };
        self.store_session(&session);
        Ok(session)
    }

    fn store_session(&self, session: &Session) {
        *self.session.write() = Some(session.clone());
        if let Some(persist) = &self.persist {
            if let Err(e) = persist.save(session) {
                warn!(path = ?persist.path(), error = %e, "Failed to save session");
            }
        }
    }
}

fn expires_at(expires_in: Option<&str>) -> chrono::DateTime<Utc> {
    let secs = expires_in
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
    Utc::now() + chrono::Duration::seconds(secs)
}

async fn read_json<T: serde::de::DeserializeOwned>(resp: Response, op: Op) -> Result<T> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| Error::network(format!("unreadable identity response: {e}")))?;

    if !status.is_success() {
        let code = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .unwrap_or(body);
        return Err(map_error(status.as_u16(), &code, op));
    }

    Ok(serde_json::from_str(&body)?)
}

/// Map a service error code to an error carrying a readable message.
/// Codes may carry detail after ` : `, e.g. `WEAK_PASSWORD : Password should be at least 6 characters`.
fn map_error(status: u16, raw: &str, op: Op) -> Error {
    let code = raw.split(" : ").next().unwrap_or(raw).trim();

    let known = match code {
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => Some(messages::INVALID_CREDENTIALS),
        "EMAIL_NOT_FOUND" => Some(messages::EMAIL_NOT_FOUND),
        "EMAIL_EXISTS" => Some(messages::EMAIL_EXISTS),
        "WEAK_PASSWORD" => Some(messages::WEAK_PASSWORD),
        "INVALID_EMAIL" => Some(messages::INVALID_EMAIL),
        "USER_DISABLED" => Some("This account has been disabled"),
        "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" | "USER_NOT_FOUND" => {
            Some("Session expired; sign in again")
        }
        _ => None,
    };

    match (known, op) {
        (Some(message), Op::SignUp) => Error::validation(message),
        (Some(message), Op::SignIn | Op::Refresh) => Error::Unauthorized(message.to_string()),
        (None, _) => Error::backend(status, raw),
    }
}

#[async_trait]
impl AuthProvider for IdentityClient {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let session = self
            .account_request("signInWithPassword", Op::SignIn, email, password)
            .await?;
        info!(user = %session.user_id, "Signed in");
        Ok(session)
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Session> {
        let session = self
            .account_request("signUp", Op::SignUp, email, password)
            .await?;
        info!(user = %session.user_id, "Created account");
        Ok(session)
    }

    fn current_session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn sign_out(&self) -> Result<()> {
        *self.session.write() = None;
        if let Some(persist) = &self.persist {
            persist.clear()?;
        }
        Ok(())
    }
}
