// Stopover itinerary search: origin -> hub -> destination -> hub -> origin,
// priced against a plain round-trip baseline.

pub mod assembler;
pub mod baseline;
pub mod config;
pub mod error;
pub mod http;
pub mod model;
pub mod orchestrator;
pub mod pricing;
pub mod token;
pub mod tuples;

// Re-export key types for convenience
pub use assembler::{ResultAssembler, SearchResult};
pub use baseline::{quote_baseline, BaselinePolicy, BaselineRequest, BaselineResponse, DEFAULT_BASELINE_POLICY};
pub use config::{AppConfig, ProviderConfig, RetryConfig, SearchSettings};
pub use error::{AuthError, CallError, PricingError, ProviderError, SearchError};
pub use http::ResilientClient;
pub use model::{Cabin, CandidateTuple, DateWindow, Offer, OffsetRange, SearchRequest};
pub use orchestrator::{SearchResponse, StopoverSearch};
pub use pricing::{FareClient, FarePricer};
pub use token::{Clock, Credential, ManualClock, SystemClock, TokenManager};
pub use tuples::{generate, TupleConstraints};
