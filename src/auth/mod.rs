//! Authentication against the hosted identity service.
//!
//! [`AuthProvider`] is the seam the rest of the binary talks to.
//! [`IdentityClient`] speaks the identity toolkit REST protocol,
//! [`InMemoryAuth`] keeps accounts in memory for tests and offline runs.

pub mod identity;
pub mod memory;
pub mod session;

pub use identity::IdentityClient;
pub use memory::InMemoryAuth;
pub use session::SessionStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinedex_common::{Error, Result, UserId};
use cinedex_store::TreeStore;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Collection holding one profile record per registered user.
pub const USERS_COLLECTION: &str = "users";

/// Messages shown for rejected credentials.
pub mod messages {
    pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
    pub const EMAIL_NOT_FOUND: &str = "No account found with this email";
    pub const EMAIL_EXISTS: &str = "An account already exists with this email";
    pub const WEAK_PASSWORD: &str = "Password is too weak";
    pub const INVALID_EMAIL: &str = "Invalid email address";
    pub const PASSWORD_MISMATCH: &str = "Passwords do not match";
    pub const NOT_SIGNED_IN: &str = "Not signed in";
}

/// A signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    /// Bearer token attached to database requests.
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Identity backend.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Sign in with email and password, replacing any current session.
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Create an account and sign it in.
    async fn create_account(&self, email: &str, password: &str) -> Result<Session>;

    /// The signed-in user, if any.
    fn current_session(&self) -> Option<Session>;

    /// Forget the current session.
    fn sign_out(&self) -> Result<()>;
}

/// Blank credentials never reach the backend.
pub(crate) fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(Error::validation("Email is required"));
    }
    if password.is_empty() {
        return Err(Error::validation("Password is required"));
    }
    Ok(())
}

/// Create an account and record its profile under `users/<uid>`.
///
/// `confirm` must repeat `password`. The profile write happens after sign-up,
/// so a store configured to read the provider's session sends the new token.
pub async fn register(
    auth: &dyn AuthProvider,
    store: &dyn TreeStore,
    email: &str,
    password: &str,
    confirm: &str,
) -> Result<Session> {
    validate_credentials(email, password)?;
    if password != confirm {
        return Err(Error::validation(messages::PASSWORD_MISMATCH));
    }

    let session = auth.create_account(email.trim(), password).await?;

    let path = format!("{}/{}", USERS_COLLECTION, session.user_id);
    store
        .write(&path, json!({ "email": session.email }))
        .await
        .inspect_err(|e| {
            tracing::error!(user = %session.user_id, error = %e, "Failed to write user profile")
        })?;

    tracing::info!(user = %session.user_id, "Registered new account");
    Ok(session)
}
