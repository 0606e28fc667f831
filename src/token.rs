// Token manager: acquires and caches the provider access credential

use std::sync::{
    atomic::{AtomicI64, AtomicUsize, Ordering},
    Arc,
};

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    config::ProviderConfig,
    error::AuthError,
    http::ResilientClient,
};

/// Seconds before expiry at which a cached credential is no longer handed out.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 30;
/// Lifetime assumed when the provider omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 1700;

pub const TOKEN_PATH: &str = "/v1/security/oauth2/token";

pub trait Clock: Send + Sync {
    /// Current time as unix epoch seconds.
    fn now(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub value: String,
    /// Unix epoch seconds.
    pub expires_at: i64,
    pub host: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("host", &self.host)
            .finish()
    }
}

impl Credential {
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - EXPIRY_SAFETY_MARGIN_SECS
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

pub struct TokenManager {
    http: ResilientClient,
    config: Arc<ProviderConfig>,
    clock: Arc<dyn Clock>,
    cache: Mutex<Option<Credential>>,
    exchanges: AtomicUsize,
}

impl TokenManager {
    pub fn new(http: ResilientClient, config: Arc<ProviderConfig>, clock: Arc<dyn Clock>) -> Self {
        Self {
            http,
            config,
            clock,
            cache: Mutex::new(None),
            exchanges: AtomicUsize::new(0),
        }
    }

    /// Number of credential exchanges performed so far.
    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Return the cached credential while it is outside the safety margin,
    /// otherwise exchange client credentials for a new one.
    pub async fn acquire(&self) -> Result<Credential, AuthError> {
        // Held across the exchange so concurrent callers never refresh twice.
        let mut cache = self.cache.lock().await;
        let now = self.clock.now();

        if let Some(credential) = cache.as_ref() {
            if credential.is_fresh(now) {
                return Ok(credential.clone());
            }
            debug!(expires_at = credential.expires_at, now, "cached credential near expiry");
        }

        let credential = self.exchange(now).await?;
        *cache = Some(credential.clone());
        Ok(credential)
    }

    /// Drop the cached credential, e.g. after the provider answered 401.
    pub async fn invalidate(&self) {
        self.cache.lock().await.take();
    }

    async fn exchange(&self, now: i64) -> Result<Credential, AuthError> {
        let creds = self
            .config
            .credentials
            .as_ref()
            .ok_or(AuthError::MissingCredentials)?;

        let host = self.config.base_url.clone();
        let request = self
            .http
            .inner()
            .post(format!("{}{}", host, TOKEN_PATH))
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", creds.client_id.as_str()),
                ("client_secret", creds.client_secret.as_str()),
            ])
            .build()
            .map_err(|e| AuthError::Decode(e.to_string()))?;

        self.exchanges.fetch_add(1, Ordering::SeqCst);
        let response = self.http.execute(request, &self.config.retry).await?;

        let status = response.status();
        if !status.is_success() {
            let body = self
                .http
                .read_body(response, &self.config.retry)
                .await
                .unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = self.http.read_body(response, &self.config.retry).await?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::Decode(e.to_string()))?;
        let lifetime = token
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        info!(expires_in = lifetime, host = %host, "acquired provider credential");
        Ok(Credential {
            value: token.access_token,
            expires_at: now + lifetime,
            host,
        })
    }
}
