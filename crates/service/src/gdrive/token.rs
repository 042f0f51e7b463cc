use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::LocalKv;

pub const TOKEN_KEY: &str = "gdrive_access_token";
pub const TOKEN_EXPIRY_KEY: &str = "gdrive_token_expiry";

/// Opaque bearer credential with an absolute expiry. There is no refresh flow.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { access_token: access_token.into(), expires_at }
    }

    /// Token as issued by an OAuth token endpoint (`expires_in` seconds from `now`).
    pub fn issued(access_token: impl Into<String>, expires_in_secs: i64, now: DateTime<Utc>) -> Self {
        Self::new(access_token, now + Duration::seconds(expires_in_secs))
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Mirrors the session token into local storage so a restart can restore it.
#[derive(Clone)]
pub struct TokenStore {
    kv: Arc<LocalKv>,
}

impl TokenStore {
    pub fn new(kv: Arc<LocalKv>) -> Self {
        Self { kv }
    }

    pub async fn load(&self) -> Option<SessionToken> {
        let token = self.kv.get(&TOKEN_KEY.to_string()).await?;
        let expiry = self.kv.get(&TOKEN_EXPIRY_KEY.to_string()).await?;
        let millis: i64 = match expiry.parse() {
            Ok(ms) => ms,
            Err(e) => {
                warn!(error = %e, "cached token expiry is not a timestamp");
                return None;
            }
        };
        let expires_at = DateTime::<Utc>::from_timestamp_millis(millis)?;
        Some(SessionToken::new(token, expires_at))
    }

    pub async fn save(&self, token: &SessionToken) {
        let access = token.access_token.clone();
        let expiry = token.expires_at.timestamp_millis().to_string();
        let res = self
            .kv
            .update_map(|m| {
                m.insert(TOKEN_KEY.to_string(), access);
                m.insert(TOKEN_EXPIRY_KEY.to_string(), expiry);
                Ok(())
            })
            .await;
        if let Err(e) = res {
            warn!(error = %e, "failed to mirror drive token");
        }
    }

    pub async fn clear(&self) {
        let res = self
            .kv
            .update_map(|m| {
                m.remove(TOKEN_KEY);
                m.remove(TOKEN_EXPIRY_KEY);
                Ok(())
            })
            .await;
        if let Err(e) = res {
            warn!(error = %e, "failed to clear mirrored drive token");
        }
    }

    /// The cached token if it is still usable at `now`.
    pub async fn valid_at(&self, now: DateTime<Utc>) -> Option<SessionToken> {
        self.load().await.filter(|t| t.is_valid_at(now))
    }
}
