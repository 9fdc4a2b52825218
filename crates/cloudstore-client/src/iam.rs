//! IAM bearer tokens
//!
//! Cloud Object Storage accepts `Authorization: Bearer <token>` where the
//! token is exchanged for an API key at the IAM identity endpoint. Tokens
//! are fetched on first use and cached until shortly before they expire.

use chrono::Utc;
use cloudstore_core::{Error, Result};
use parking_lot::RwLock;
use serde::Deserialize;
use std::fmt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Tokens this close to expiry are treated as expired
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Token response from the IAM identity endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct IamToken {
    pub access_token: String,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime in seconds
    pub expires_in: i64,

    /// Unix timestamp (seconds) after which the token is rejected
    pub expiration: i64,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl IamToken {
    pub fn is_fresh_at(&self, now_secs: i64) -> bool {
        now_secs + EXPIRY_MARGIN_SECS < self.expiration
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now().timestamp())
    }

    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        now_secs >= self.expiration
    }
}

/// Exchanges an API key for bearer tokens and caches the result
pub struct IamTokenProvider {
    http: reqwest::Client,
    auth_endpoint: String,
    api_key: String,
    cached: RwLock<Option<IamToken>>,
    refresh: Mutex<()>,
}

impl fmt::Debug for IamTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamTokenProvider")
            .field("auth_endpoint", &self.auth_endpoint)
            .field("api_key", &"***")
            .field("cached", &self.cached.read().is_some())
            .finish()
    }
}

impl IamTokenProvider {
    /// Create a provider; no request is made until a token is needed
    pub fn new(auth_endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_endpoint: auth_endpoint.into(),
            api_key: api_key.into(),
            cached: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    /// The cached access token, if it is still fresh
    pub fn cached_token(&self) -> Option<String> {
        self.cached
            .read()
            .as_ref()
            .filter(|token| token.is_fresh())
            .map(|token| token.access_token.clone())
    }

    /// The most recently obtained access token, unless it has already expired.
    ///
    /// Unlike [`cached_token`](Self::cached_token) this ignores the refresh
    /// margin, so a token IAM issued with less than a minute to live can still
    /// be sent on the request it was fetched for.
    pub fn current_token(&self) -> Option<String> {
        let now = Utc::now().timestamp();
        self.cached
            .read()
            .as_ref()
            .filter(|token| !token.is_expired_at(now))
            .map(|token| token.access_token.clone())
    }

    /// A fresh access token, exchanging the API key if needed
    pub async fn token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;

        // Another caller may have refreshed while we waited.
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *self.cached.write() = Some(token);

        Ok(access_token)
    }

    async fn request_token(&self) -> Result<IamToken> {
        debug!("Requesting IAM token from {}", self.auth_endpoint);

        let resp = self
            .http
            .post(&self.auth_endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", APIKEY_GRANT_TYPE),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::Transient(format!("IAM token request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "IAM token request rejected");

            let detail = format!("IAM token request returned {}: {}", status, body);
            return Err(match status.as_u16() {
                400 | 401 | 403 => Error::AccessDenied(detail),
                408 | 429 | 500..=599 => Error::Transient(detail),
                _ => Error::Unknown(detail),
            });
        }

        let token: IamToken = resp
            .json()
            .await
            .map_err(|e| Error::Unknown(format!("Invalid IAM token response: {}", e)))?;

        info!("Obtained IAM token (expires in {}s)", token.expires_in);
        Ok(token)
    }
}
