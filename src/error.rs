// Error taxonomy for the stopover search core

use thiserror::Error;

// Network-level failures from the resilient call layer.
// Normal HTTP error statuses are never reported here, the caller gets the response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallError {
    #[error("Request timeout after {timeout_ms}ms ({attempts} attempts)")]
    Timeout { timeout_ms: u64, attempts: u32 },

    #[error("Network error after {attempts} attempts: {message}")]
    Network { message: String, attempts: u32 },

    #[error("Response body not received within {timeout_ms}ms")]
    BodyTimeout { timeout_ms: u64 },

    #[error("Response body could not be read: {message}")]
    Body { message: String },

    #[error("Request could not be cloned for retry")]
    NotCloneable,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Missing provider credentials (AMADEUS_API_KEY/AMADEUS_API_SECRET)")]
    MissingCredentials,

    #[error("Credential exchange rejected: {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("Credential exchange failed: {0}")]
    Transport(#[from] CallError),

    #[error("Credential response could not be decoded: {0}")]
    Decode(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error(transparent)]
    Call(#[from] CallError),

    #[error("Provider response could not be decoded: {0}")]
    Decode(String),
}

// What the pricing adapter hands back: auth failures stay fatal,
// everything else is a provider failure the caller may skip.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SearchError {
    /// True for failures caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::Validation(_))
    }
}

impl From<PricingError> for SearchError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::Auth(e) => SearchError::Auth(e),
            PricingError::Provider(e) => SearchError::Provider(e),
        }
    }
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Validation(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}
