use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use configs::GDriveConfig;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::error::DriveError;
use super::token::SessionToken;

/// Source of a fresh session token, normally the end of an interactive consent.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn obtain_token(&self, now: DateTime<Utc>) -> Result<SessionToken, DriveError>;
}

/// OAuth2 authorization-code client for Google.
pub struct OAuthClient {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    scope: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

fn default_expires_in() -> i64 { 3600 }

impl OAuthClient {
    pub fn from_config(cfg: &GDriveConfig) -> Result<Self, DriveError> {
        if !cfg.is_configured() {
            return Err(DriveError::Auth("gdrive.client_id is not configured".into()));
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.request_timeout_secs))
            .build()
            .map_err(|e| DriveError::ClientLoad(e.to_string()))?;
        Ok(Self {
            http,
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            redirect_uri: cfg.redirect_uri.clone(),
            auth_url: cfg.auth_url.clone(),
            token_url: cfg.token_url.clone(),
            scope: cfg.scope.clone(),
        })
    }

    /// Consent page URL. `state` is echoed back on the callback.
    pub fn authorize_url(&self, state: &str) -> Result<String, DriveError> {
        let url = Url::parse_with_params(
            &self.auth_url,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", self.scope.as_str()),
                ("access_type", "online"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| DriveError::Auth(format!("invalid auth url: {e}")))?;
        Ok(url.into())
    }

    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str, now: DateTime<Utc>) -> Result<SessionToken, DriveError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let reason = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| e.error_description.unwrap_or(e.error))
                .unwrap_or_else(|_| format!("token endpoint returned {status}"));
            warn!(%status, %reason, "authorization code exchange rejected");
            return Err(DriveError::Auth(reason));
        }
        let token: TokenResponse = resp.json().await?;
        info!(expires_in = token.expires_in, "drive session token issued");
        Ok(SessionToken::issued(token.access_token, token.expires_in, now))
    }
}

/// Completes consent by exchanging the authorization code returned to the callback.
pub struct CodeExchange<'a> {
    pub client: &'a OAuthClient,
    pub code: String,
}

#[async_trait]
impl TokenProvider for CodeExchange<'_> {
    async fn obtain_token(&self, now: DateTime<Utc>) -> Result<SessionToken, DriveError> {
        if self.code.trim().is_empty() {
            return Err(DriveError::Auth("authorization code is empty".into()));
        }
        self.client.exchange_code(&self.code, now).await
    }
}

/// Token providers for tests
pub mod mock {
    use super::*;

    /// Hands out a fixed token, as if the user had just consented.
    pub struct FixedToken(pub SessionToken);

    #[async_trait]
    impl TokenProvider for FixedToken {
        async fn obtain_token(&self, _now: DateTime<Utc>) -> Result<SessionToken, DriveError> {
            Ok(self.0.clone())
        }
    }

    /// The user closed the consent popup.
    pub struct DeniedConsent;

    #[async_trait]
    impl TokenProvider for DeniedConsent {
        async fn obtain_token(&self, _now: DateTime<Utc>) -> Result<SessionToken, DriveError> {
            Err(DriveError::Auth("access_denied".into()))
        }
    }
}
