//! REST client for the hosted real-time database.
//!
//! Each path maps to `<base>/<path>.json`. Writes use `PUT`, merge-patches
//! `PATCH`, deletes `DELETE`. Subscriptions open a `text/event-stream`
//! request; the server first sends the whole value as a `put` at `/`, then
//! a `put` or `patch` for every change. The client replays those events
//! onto a local mirror and delivers the mirror after each one.

use std::time::Duration;

use async_trait::async_trait;
use cinedex_common::{Error, Result};
use futures::StreamExt;
use parking_lot::{Mutex, RwLock};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::push_id::PushIdGenerator;
use crate::sse::{SseDecoder, SseEvent};
use crate::tree::{Snapshot, Subscription, TreeStore};
use crate::tree_path;

/// Timeout for one-shot requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Streams stay open indefinitely; only connecting is bounded.
const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const SUBSCRIPTION_BUFFER: usize = 16;

/// Supplies the session token at request time.
pub type TokenSource = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Client for one database instance.
pub struct RealtimeDbStore {
    client: Client,
    stream_client: Client,
    base_url: String,
    auth_token: RwLock<Option<String>>,
    token_source: RwLock<Option<TokenSource>>,
    keys: Mutex<PushIdGenerator>,
}

impl RealtimeDbStore {
    /// Create a client for the database at `base_url`
    /// (e.g. `https://my-app-default-rtdb.firebaseio.com`).
    pub fn new(base_url: &str) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            });
        let stream_client = Client::builder()
            .connect_timeout(STREAM_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build streaming HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            stream_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: RwLock::new(None),
            token_source: RwLock::new(None),
            keys: Mutex::new(PushIdGenerator::new()),
        }
    }

    /// Attach (or clear) the session token sent with every request.
    pub fn set_auth_token(&self, token: Option<String>) {
        *self.auth_token.write() = token;
    }

    /// Ask `source` for the token on every request that has no fixed token,
    /// so a sign-in made after construction is picked up.
    pub fn set_token_source(&self, source: TokenSource) {
        *self.token_source.write() = Some(source);
    }

    fn current_token(&self) -> Option<String> {
        if let Some(token) = self.auth_token.read().clone() {
            return Some(token);
        }
        self.token_source.read().as_ref().and_then(|source| source())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/<path>.json`, with every segment percent-encoded.
    fn url(&self, path: &str) -> Result<Url> {
        let segs = tree_path::segments(path)?;
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::validation(format!("invalid database url {:?}: {e}", self.base_url)))?;
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| Error::validation(format!("database url cannot take a path: {}", self.base_url)))?;
            parts.pop_if_empty();
            match segs.split_last() {
                Some((last, parents)) => {
                    for seg in parents {
                        parts.push(seg);
                    }
                    parts.push(&format!("{last}.json"));
                }
                None => {
                    parts.push(".json");
                }
            }
        }
        Ok(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match self.current_token() {
            Some(token) => req.query(&[("auth", token.as_str())]),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder, op: &str, path: &str) -> Result<Response> {
        debug!(op, path, "Database request");
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| Error::network(format!("{op} {path} failed: {e}")))?;
        check_status(resp).await
    }
}

/// Pass successful responses through; turn the rest into [`Error::Backend`]
/// carrying the server's `error` message.
async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                body
            }
        });
    Err(Error::backend(status.as_u16(), message))
}

#[async_trait]
impl TreeStore for RealtimeDbStore {
    fn generate_key(&self) -> String {
        self.keys.lock().generate()
    }

    async fn write(&self, path: &str, value: Value) -> Result<()> {
        let req = self
            .client
            .put(self.url(path)?)
            .query(&[("print", "silent")])
            .json(&value);
        self.send(req, "PUT", path).await?;
        Ok(())
    }

    async fn patch(&self, path: &str, fields: Map<String, Value>) -> Result<()> {
        let req = self
            .client
            .patch(self.url(path)?)
            .query(&[("print", "silent")])
            .json(&fields);
        self.send(req, "PATCH", path).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let req = self.client.delete(self.url(path)?);
        self.send(req, "DELETE", path).await?;
        Ok(())
    }

    async fn read_once(&self, path: &str) -> Result<Snapshot> {
        let req = self.client.get(self.url(path)?);
        let resp = self.send(req, "GET", path).await?;
        let value: Value = resp
            .json()
            .await
            .map_err(|e| Error::network(format!("GET {path} returned an unreadable body: {e}")))?;
        Ok(if value.is_null() { None } else { Some(value) })
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        let req = self
            .stream_client
            .get(self.url(path)?)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let resp = self.send(req, "STREAM", path).await?;

        let (sub, tx, token) = Subscription::channel(path, SUBSCRIPTION_BUFFER);
        let path = path.to_string();

        tokio::spawn(async move {
            let mut body = resp.bytes_stream();
            let mut decoder = SseDecoder::new();
            let mut mirror = Value::Null;
            let mut last: Option<Snapshot> = None;

            loop {
                let chunk = tokio::select! {
                    _ = token.cancelled() => break,
                    chunk = body.next() => chunk,
                };

                let bytes = match chunk {
                    Some(Ok(bytes)) => bytes,
                    Some(Err(e)) => {
                        let err = Error::network(format!("stream on {path} failed: {e}"));
                        tokio::select! {
                            _ = token.cancelled() => {}
                            _ = tx.send(Err(err)) => {}
                        }
                        break;
                    }
                    None => {
                        debug!(%path, "Server closed the event stream");
                        break;
                    }
                };

                for event in decoder.push(&bytes) {
                    match apply_event(&mut mirror, &event) {
                        Ok(StreamStep::Changed) => {
                            let current = if mirror.is_null() {
                                None
                            } else {
                                Some(mirror.clone())
                            };
                            if last.as_ref() == Some(&current) {
                                continue;
                            }
                            last = Some(current.clone());
                            // A full buffer must not outlive cancellation.
                            tokio::select! {
                                _ = token.cancelled() => return,
                                res = tx.send(Ok(current)) => if res.is_err() { return },
                            }
                        }
                        Ok(StreamStep::Idle) => {}
                        Err(e) => {
                            warn!(%path, error = %e, "Event stream terminated by server");
                            tokio::select! {
                                _ = token.cancelled() => {}
                                _ = tx.send(Err(e)) => {}
                            }
                            return;
                        }
                    }
                }
            }
            debug!(%path, "Realtime subscription stopped");
        });

        Ok(sub)
    }
}

/// What a single stream event did to the mirror.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum StreamStep {
    Changed,
    Idle,
}

#[derive(Debug, Deserialize)]
struct EventData {
    path: String,
    data: Value,
}

/// Replay one server event onto `mirror`.
pub(crate) fn apply_event(mirror: &mut Value, event: &SseEvent) -> Result<StreamStep> {
    match event.event.as_str() {
        "put" => {
            let payload: EventData = serde_json::from_str(&event.data)?;
            let segs = tree_path::segments(&payload.path)?;
            tree_path::set(mirror, &segs, payload.data);
            Ok(StreamStep::Changed)
        }
        "patch" => {
            let payload: EventData = serde_json::from_str(&event.data)?;
            let segs = tree_path::segments(&payload.path)?;
            match payload.data {
                Value::Object(children) => tree_path::merge(mirror, &segs, children)?,
                Value::Null => {}
                other => {
                    return Err(Error::internal(format!(
                        "patch event carried a non-object payload: {other}"
                    )))
                }
            }
            Ok(StreamStep::Changed)
        }
        "keep-alive" => Ok(StreamStep::Idle),
        "cancel" => Err(Error::backend(401, "Permission denied")),
        "auth_revoked" => Err(Error::Unauthorized(
            "Session expired; sign in again".to_string(),
        )),
        other => {
            debug!(event = other, "Ignoring unknown stream event");
            Ok(StreamStep::Idle)
        }
    }
}
