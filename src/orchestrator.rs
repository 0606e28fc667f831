// Hub fallback orchestrator
//
// Hubs are tried in order: the requested hub first, then the configured
// fallbacks. The first hub that prices at least one tuple wins and no further
// hub is tried. Tuples are priced one at a time, never in parallel.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    assembler::{RawResult, ResultAssembler, SearchResult},
    baseline::{BaselinePolicy, DEFAULT_BASELINE_POLICY},
    config::SearchSettings,
    error::{AuthError, PricingError, ProviderError, SearchError},
    model::{Cabin, CandidateTuple, DateWindow, OffsetRange, PricingParams, Route, SearchRequest},
    pricing::FarePricer,
    tuples::{generate, TupleConstraints},
};

/// Why a single tuple produced no result. Never aborts the hub loop.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoOffers,
    Provider(ProviderError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TupleOutcome {
    Priced(RawResult),
    Skipped {
        tuple: CandidateTuple,
        reason: SkipReason,
    },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubAttempt {
    pub hub: String,
    pub tuples_tried: usize,
    pub priced: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintsEcho {
    pub depart_window: DateWindow,
    pub return_window: DateWindow,
    pub pre_offset_range: OffsetRange,
    pub dwell_range: OffsetRange,
    pub post_offset_range: OffsetRange,
    pub cabin: Cabin,
    pub traveler_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub currency: String,
    pub origin: String,
    pub hub: Option<String>,
    pub destination: String,
    pub tried_hubs: Vec<String>,
    pub results: Vec<SearchResult>,
    pub constraints: ConstraintsEcho,
    pub baseline_hint: String,
    pub attempts: Vec<HubAttempt>,
}

// Outer state machine over the hub list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HubPhase {
    Try(usize),
    Productive(usize),
    Exhausted,
}

/// Primary hub first, then fallbacks; upper-cased, deduplicated, never equal
/// to the origin or destination, and capped at `max_hubs`.
pub fn build_hub_list(request: &SearchRequest, settings: &SearchSettings) -> Vec<String> {
    let mut hubs: Vec<String> = Vec::new();
    let fallbacks: &[String] = if request.allow_fallback_hubs {
        settings.fallback_hubs.as_slice()
    } else {
        &[]
    };

    for hub in request.hub.iter().chain(fallbacks.iter()) {
        let hub = hub.trim().to_ascii_uppercase();
        if hub.len() != 3 || hub == request.origin || hub == request.destination {
            continue;
        }
        if !hubs.contains(&hub) {
            hubs.push(hub);
        }
        if hubs.len() >= settings.max_hubs {
            break;
        }
    }
    hubs
}

pub struct StopoverSearch<P: FarePricer> {
    pricer: P,
    settings: SearchSettings,
    baseline_policy: BaselinePolicy,
}

impl<P: FarePricer> StopoverSearch<P> {
    pub fn new(pricer: P, settings: SearchSettings) -> Self {
        Self {
            pricer,
            settings,
            baseline_policy: DEFAULT_BASELINE_POLICY,
        }
    }

    pub fn with_baseline_policy(mut self, policy: BaselinePolicy) -> Self {
        self.baseline_policy = policy;
        self
    }

    pub fn pricer(&self) -> &P {
        &self.pricer
    }

    pub async fn search(&self, mut request: SearchRequest) -> Result<SearchResponse, SearchError> {
        request.validate()?;

        let hubs = build_hub_list(&request, &self.settings);
        if hubs.is_empty() {
            return Err(SearchError::Validation(
                "no candidate hub distinct from origin and destination".to_string(),
            ));
        }

        // Credentials are checked before any pricing call goes out.
        self.pricer.authorize().await?;

        let constraints = TupleConstraints::from_request(&request, self.settings.max_depart_days);
        let params = request.pricing_params();

        let mut tried_hubs = Vec::new();
        let mut attempts = Vec::new();
        let mut collected = Vec::new();
        let mut phase = HubPhase::Try(0);

        loop {
            phase = match phase {
                HubPhase::Try(index) if index >= hubs.len() => HubPhase::Exhausted,
                HubPhase::Try(index) => {
                    let route = Route::new(&request.origin, &hubs[index], &request.destination);
                    tried_hubs.push(route.hub.clone());

                    let (priced, attempt) = self
                        .search_hub(&route, &constraints, &params, request.max_results)
                        .await?;
                    info!(
                        hub = %attempt.hub,
                        tried = attempt.tuples_tried,
                        priced = attempt.priced,
                        skipped = attempt.skipped,
                        "hub searched"
                    );
                    attempts.push(attempt);

                    if priced.is_empty() {
                        HubPhase::Try(index + 1)
                    } else {
                        collected = priced;
                        HubPhase::Productive(index)
                    }
                }
                HubPhase::Productive(index) => {
                    debug!(hub = %hubs[index], results = collected.len(), "stopping at first productive hub");
                    break;
                }
                HubPhase::Exhausted => {
                    warn!(hubs = ?tried_hubs, "no hub produced a priced itinerary");
                    break;
                }
            };
        }

        let assembler = ResultAssembler::new(&self.pricer, &params, self.baseline_policy);
        let results = assembler.assemble(collected).await?;

        Ok(SearchResponse {
            currency: request.currency.clone(),
            origin: request.origin.clone(),
            hub: request.hub.clone(),
            destination: request.destination.clone(),
            tried_hubs,
            results,
            constraints: ConstraintsEcho {
                depart_window: request.depart_window,
                return_window: request.return_window,
                pre_offset_range: request.pre_offset_range,
                dwell_range: request.dwell_range,
                post_offset_range: request.post_offset_range,
                cabin: request.cabin,
                traveler_count: request.traveler_count,
            },
            baseline_hint: self.baseline_policy.hint().to_string(),
            attempts,
        })
    }

    // Price this hub's tuples until they run out or `max_results` succeed.
    async fn search_hub(
        &self,
        route: &Route,
        constraints: &TupleConstraints,
        params: &PricingParams,
        max_results: usize,
    ) -> Result<(Vec<RawResult>, HubAttempt), SearchError> {
        let mut priced = Vec::new();
        let mut attempt = HubAttempt {
            hub: route.hub.clone(),
            ..Default::default()
        };

        let mut tuples = generate(constraints);
        for tuple in tuples.by_ref() {
            if priced.len() >= max_results {
                break;
            }
            attempt.tuples_tried += 1;

            match self.price_tuple(route, tuple, params).await? {
                TupleOutcome::Priced(result) => {
                    attempt.priced += 1;
                    priced.push(result);
                }
                TupleOutcome::Skipped { tuple, reason } => {
                    attempt.skipped += 1;
                    debug!(hub = %route.hub, outbound = %tuple.outbound_date, reason = ?reason, "tuple skipped");
                }
            }
        }

        if tuples.overflowed() {
            return Err(SearchError::Internal(format!(
                "candidate dates for hub {} fall outside the supported calendar",
                route.hub
            )));
        }

        Ok((priced, attempt))
    }

    pub async fn price_tuple(
        &self,
        route: &Route,
        tuple: CandidateTuple,
        params: &PricingParams,
    ) -> Result<TupleOutcome, AuthError> {
        match self.pricer.price_multi_leg(route, &tuple, params).await {
            Ok(Some(offer)) => Ok(TupleOutcome::Priced(RawResult {
                tuple,
                route: route.clone(),
                offer,
            })),
            Ok(None) => Ok(TupleOutcome::Skipped {
                tuple,
                reason: SkipReason::NoOffers,
            }),
            Err(PricingError::Provider(err)) => Ok(TupleOutcome::Skipped {
                tuple,
                reason: SkipReason::Provider(err),
            }),
            Err(PricingError::Auth(err)) => Err(err),
        }
    }
}
