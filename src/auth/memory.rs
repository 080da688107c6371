use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use cinedex_common::{Error, Result, UserId};
use parking_lot::{Mutex, RwLock};
use rand::distributions::Alphanumeric;
use rand::Rng;

use super::{messages, validate_credentials, AuthProvider, Session};

const MIN_PASSWORD_LEN: usize = 6;

struct Account {
    user_id: UserId,
    password: String,
}

/// Accounts held in memory, with the same rules and messages as the
/// hosted service.
#[derive(Default)]
pub struct InMemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
    session: RwLock<Option<Session>>,
}

impl InMemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&self, user_id: UserId, email: &str) -> Session {
        let session = Session {
            user_id,
            email: email.to_string(),
            id_token: random_token(32),
            refresh_token: random_token(32),
            expires_at: Utc::now() + Duration::hours(1),
        };
        *self.session.write() = Some(session.clone());
        session
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        validate_credentials(email, password)?;
        let email = normalize_email(email);

        let user_id = {
            let accounts = self.accounts.lock();
            let account = accounts
                .get(&email)
                .ok_or_else(|| Error::Unauthorized(messages::EMAIL_NOT_FOUND.to_string()))?;
            if account.password != password {
                return Err(Error::Unauthorized(
                    messages::INVALID_CREDENTIALS.to_string(),
                ));
            }
            account.user_id.clone()
        };

        Ok(self.issue(user_id, &email))
    }

    async fn create_account(&self, email: &str, password: &str) -> Result<Session> {
        validate_credentials(email, password)?;
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(Error::validation(messages::INVALID_EMAIL));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::validation(messages::WEAK_PASSWORD));
        }

        let user_id = {
            let mut accounts = self.accounts.lock();
            if accounts.contains_key(&email) {
                return Err(Error::validation(messages::EMAIL_EXISTS));
            }
            let user_id = UserId::new(random_token(28));
            accounts.insert(
                email.clone(),
                Account {
                    user_id: user_id.clone(),
                    password: password.to_string(),
                },
            );
            user_id
        };

        Ok(self.issue(user_id, &email))
    }

    fn current_session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    fn sign_out(&self) -> Result<()> {
        *self.session.write() = None;
        Ok(())
    }
}
