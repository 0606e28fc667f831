// Provider and search configuration, loaded from the process environment

use std::{env, fmt, str::FromStr, time::Duration};

use rand::Rng;

use crate::error::ConfigError;

pub const TEST_HOST: &str = "https://test.api.amadeus.com";
pub const PRODUCTION_HOST: &str = "https://api.amadeus.com";

pub const DEFAULT_FALLBACK_HUBS: [&str; 6] = ["CDG", "ATH", "IST", "FRA", "AMS", "FCO"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEnv {
    Test,
    Production,
}

impl ProviderEnv {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("production") => ProviderEnv::Production,
            _ => ProviderEnv::Test,
        }
    }

    pub fn host(&self) -> &'static str {
        match self {
            ProviderEnv::Test => TEST_HOST,
            ProviderEnv::Production => PRODUCTION_HOST,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEnv::Test => "test",
            ProviderEnv::Production => "production",
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

// Timeout and retry policy for a single outbound call
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 12_000,
            max_retries: 2,
            min_backoff_ms: 300,
            max_backoff_ms: 800,
        }
    }
}

impl RetryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    // Random pause in [min_backoff_ms, max_backoff_ms]
    pub fn calculate_backoff(&self) -> Duration {
        let low = self.min_backoff_ms.min(self.max_backoff_ms);
        let high = self.max_backoff_ms.max(self.min_backoff_ms);
        Duration::from_millis(rand::thread_rng().gen_range(low..=high))
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub environment: ProviderEnv,
    pub base_url: String,
    pub credentials: Option<ClientCredentials>,
    pub retry: RetryConfig,
    /// Upper bound on offers requested per pricing query.
    pub max_offers: u32,
}

impl ProviderConfig {
    pub fn new(base_url: &str, credentials: Option<ClientCredentials>) -> Self {
        Self {
            environment: ProviderEnv::Test,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            retry: RetryConfig::default(),
            max_offers: 50,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub fallback_hubs: Vec<String>,
    pub max_hubs: usize,
    /// Depart windows longer than this are clamped before enumeration.
    pub max_depart_days: i64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            fallback_hubs: DEFAULT_FALLBACK_HUBS.iter().map(|h| h.to_string()).collect(),
            max_hubs: 8,
            max_depart_days: 31,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub search: SearchSettings,
    /// Each variable is reported on its own, even when the pair is incomplete.
    pub key_present: bool,
    pub secret_present: bool,
}

impl AppConfig {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = ProviderEnv::parse(lookup("AMADEUS_ENV").as_deref());
        let base_url = lookup("AMADEUS_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| environment.host().to_string());

        let key = lookup("AMADEUS_API_KEY").filter(|v| !v.is_empty());
        let secret = lookup("AMADEUS_API_SECRET").filter(|v| !v.is_empty());
        let present = |v: &Option<String>| v.as_ref().map(|s| s.len() > 5).unwrap_or(false);
        let (key_present, secret_present) = (present(&key), present(&secret));

        let credentials = match (key, secret) {
            (Some(client_id), Some(client_secret)) => Some(ClientCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let defaults = RetryConfig::default();
        let retry = RetryConfig {
            timeout_ms: parse_or(&lookup, "PROVIDER_TIMEOUT_MS", defaults.timeout_ms)?,
            max_retries: parse_or(&lookup, "PROVIDER_MAX_RETRIES", defaults.max_retries)?,
            ..defaults
        };

        let mut provider = ProviderConfig::new(&base_url, credentials);
        provider.environment = environment;
        provider.retry = retry;
        provider.max_offers = parse_or(&lookup, "PROVIDER_MAX_OFFERS", provider.max_offers)?;

        let mut search = SearchSettings::default();
        if let Some(hubs) = lookup("STOPOVER_FALLBACK_HUBS") {
            search.fallback_hubs = hubs
                .split(',')
                .map(|h| h.trim().to_ascii_uppercase())
                .filter(|h| !h.is_empty())
                .collect();
        }
        search.max_hubs = parse_or(&lookup, "STOPOVER_MAX_HUBS", search.max_hubs)?;

        Ok(Self {
            provider,
            search,
            key_present,
            secret_present,
        })
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            ok: true,
            env: self.provider.environment.as_str().to_string(),
            key_present: self.key_present,
            secret_present: self.secret_present,
        }
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub ok: bool,
    pub env: String,
    pub key_present: bool,
    pub secret_present: bool,
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_use_test_host_without_credentials() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.provider.environment, ProviderEnv::Test);
        assert_eq!(config.provider.base_url, TEST_HOST);
        assert!(config.provider.credentials.is_none());
        assert_eq!(config.provider.retry, RetryConfig::default());
        assert_eq!(config.search.max_hubs, 8);
        assert_eq!(config.search.max_depart_days, 31);
    }

    #[test]
    fn test_production_env_and_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("AMADEUS_ENV", "production"),
            ("AMADEUS_API_KEY", "key-123456"),
            ("AMADEUS_API_SECRET", "secret-123456"),
            ("PROVIDER_MAX_RETRIES", "4"),
            ("STOPOVER_FALLBACK_HUBS", "ist, lhr,,mad"),
        ]))
        .unwrap();

        assert_eq!(config.provider.base_url, PRODUCTION_HOST);
        assert_eq!(config.provider.retry.max_retries, 4);
        assert_eq!(config.search.fallback_hubs, vec!["IST", "LHR", "MAD"]);

        let health = config.health();
        assert_eq!(health.env, "production");
        assert!(health.key_present && health.secret_present);
    }

    #[test]
    fn test_health_reports_key_without_secret() {
        let config = AppConfig::from_lookup(lookup(&[("AMADEUS_API_KEY", "key-123456")])).unwrap();
        let health = config.health();

        assert!(config.provider.credentials.is_none());
        assert!(health.key_present);
        assert!(!health.secret_present);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("PROVIDER_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "PROVIDER_TIMEOUT_MS"));
    }

    #[test]
    fn test_secret_is_redacted() {
        let creds = ClientCredentials {
            client_id: "id".to_string(),
            client_secret: "hunter2".to_string(),
        };
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn test_backoff_stays_in_window() {
        let retry = RetryConfig::default();
        for _ in 0..50 {
            let backoff = retry.calculate_backoff();
            assert!(backoff >= Duration::from_millis(300));
            assert!(backoff <= Duration::from_millis(800));
        }
    }
}
