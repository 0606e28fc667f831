// Baseline fares: plain origin <-> destination round trips used as a reference
// for stopover prices.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    error::{PricingError, SearchError},
    model::{normalize_iata, Cabin, CandidateTuple, DateWindow, PricingParams, DEFAULT_CURRENCY},
    pricing::FarePricer,
};

/// Which tuple dates a baseline round trip is priced on.
///
/// Neither choice reproduces the stopover itinerary exactly, so every
/// baseline produced under a policy is reported as approximate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaselinePolicy {
    /// hub -> destination date out, destination -> hub date back
    DestinationStay,
    /// origin -> hub date out, hub -> origin date back
    FullTrip,
}

pub const DEFAULT_BASELINE_POLICY: BaselinePolicy = BaselinePolicy::DestinationStay;

impl BaselinePolicy {
    pub fn dates(&self, tuple: &CandidateTuple) -> (NaiveDate, NaiveDate) {
        match self {
            BaselinePolicy::DestinationStay => (tuple.hub_depart_date, tuple.hub_return_date),
            BaselinePolicy::FullTrip => (tuple.outbound_date, tuple.inbound_date),
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            BaselinePolicy::DestinationStay => {
                "Baseline computed per tuple using the destination leg dates (approximate)."
            }
            BaselinePolicy::FullTrip => {
                "Baseline computed per tuple using the first and last leg dates (approximate)."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineFare {
    pub total: f64,
    pub currency: String,
    pub approximate: bool,
    pub policy: BaselinePolicy,
}

// Prices baselines for one assembly pass; identical date pairs are priced once.
pub struct BaselineLookup<'a, P: FarePricer + ?Sized> {
    pricer: &'a P,
    origin: &'a str,
    destination: &'a str,
    params: &'a PricingParams,
    policy: BaselinePolicy,
    memo: HashMap<(NaiveDate, NaiveDate), Option<BaselineFare>>,
}

impl<'a, P: FarePricer + ?Sized> BaselineLookup<'a, P> {
    pub fn new(
        pricer: &'a P,
        origin: &'a str,
        destination: &'a str,
        params: &'a PricingParams,
        policy: BaselinePolicy,
    ) -> Self {
        Self {
            pricer,
            origin,
            destination,
            params,
            policy,
            memo: HashMap::new(),
        }
    }

    pub fn lookups(&self) -> usize {
        self.memo.len()
    }

    /// Baseline for `tuple`. Provider failures give `None`, auth failures abort.
    pub async fn fare_for(&mut self, tuple: &CandidateTuple) -> Result<Option<BaselineFare>, SearchError> {
        let dates = self.policy.dates(tuple);
        if let Some(cached) = self.memo.get(&dates) {
            return Ok(cached.clone());
        }

        let fare = match self
            .pricer
            .price_round_trip(self.origin, self.destination, dates.0, dates.1, self.params)
            .await
        {
            Ok(Some(quote)) => quote.offer.total.map(|total| BaselineFare {
                total,
                currency: quote
                    .offer
                    .currency
                    .unwrap_or_else(|| self.params.currency.clone()),
                approximate: true,
                policy: self.policy,
            }),
            Ok(None) => None,
            Err(PricingError::Auth(err)) => return Err(err.into()),
            Err(PricingError::Provider(err)) => {
                warn!(error = %err, depart = %dates.0, ret = %dates.1, "baseline unavailable");
                None
            }
        };

        debug!(depart = %dates.0, ret = %dates.1, found = fare.is_some(), "baseline priced");
        self.memo.insert(dates, fare.clone());
        Ok(fare)
    }
}

fn default_traveler_count() -> u32 {
    1
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

// Standalone baseline query
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineRequest {
    pub origin: String,
    pub destination: String,
    pub depart_window: DateWindow,
    pub return_window: DateWindow,
    #[serde(default = "default_traveler_count")]
    pub traveler_count: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub cabin: Cabin,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineQuote {
    pub total: Option<f64>,
    pub currency: Option<String>,
    pub validating_airline_codes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineResponse {
    pub origin: String,
    pub destination: String,
    pub depart_date: NaiveDate,
    pub return_date: NaiveDate,
    pub currency: String,
    pub baseline: Option<BaselineQuote>,
    pub raw_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Price the plain round trip leaving on the first day of the depart window
/// and returning on the last day of the return window.
pub async fn quote_baseline<P: FarePricer + ?Sized>(
    pricer: &P,
    request: &BaselineRequest,
) -> Result<BaselineResponse, SearchError> {
    let origin = normalize_iata(&request.origin, "origin")?;
    let destination = normalize_iata(&request.destination, "destination")?;
    let depart_date = request.depart_window.start();
    let return_date = request.return_window.end();
    if return_date < depart_date {
        return Err(SearchError::Validation(
            "returnWindow ends before departWindow starts".to_string(),
        ));
    }

    let params = PricingParams {
        traveler_count: request.traveler_count.max(1),
        currency: request.currency.to_ascii_uppercase(),
        cabin: request.cabin,
    };

    let quote = pricer
        .price_round_trip(&origin, &destination, depart_date, return_date, &params)
        .await?;

    let (baseline, raw_count) = match quote {
        Some(q) => (
            Some(BaselineQuote {
                total: q.offer.total,
                currency: q.offer.currency,
                validating_airline_codes: q.offer.carrier_codes,
            }),
            q.offer_count,
        ),
        None => (None, 0),
    };

    Ok(BaselineResponse {
        message: baseline.is_none().then(|| "No baseline offers found".to_string()),
        origin,
        destination,
        depart_date,
        return_date,
        currency: params.currency,
        baseline,
        raw_count,
    })
}
