// Pricing adapter: builds provider requests for multi-leg and round-trip
// queries and extracts the cheapest offer from the response.

use std::{cmp::Ordering, sync::Arc};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    config::ProviderConfig,
    error::{AuthError, PricingError, ProviderError},
    http::ResilientClient,
    model::{CandidateTuple, Leg, Offer, PricingParams, Route},
    token::{Clock, TokenManager},
};

pub const FLIGHT_OFFERS_PATH: &str = "/v2/shopping/flight-offers";

// Seam between the search logic and the fare provider
#[async_trait]
pub trait FarePricer: Send + Sync {
    /// Make sure a usable credential exists before any pricing call.
    async fn authorize(&self) -> Result<(), AuthError>;

    async fn price_multi_leg(
        &self,
        route: &Route,
        tuple: &CandidateTuple,
        params: &PricingParams,
    ) -> Result<Option<Offer>, PricingError>;

    async fn price_round_trip(
        &self,
        origin: &str,
        destination: &str,
        depart_date: NaiveDate,
        return_date: NaiveDate,
        params: &PricingParams,
    ) -> Result<Option<RoundTripQuote>, PricingError>;
}

/// Cheapest round-trip offer plus how many offers the provider returned.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTripQuote {
    pub offer: Offer,
    pub offer_count: usize,
}

// ---- provider wire format ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiCityBody {
    currency_code: String,
    travelers: Vec<Traveler>,
    sources: Vec<&'static str>,
    origin_destinations: Vec<OriginDestination>,
    search_criteria: SearchCriteria,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Traveler {
    id: String,
    traveler_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OriginDestination {
    id: String,
    origin_location_code: String,
    destination_location_code: String,
    departure_date_time_range: DepartureDate,
}

#[derive(Debug, Serialize)]
struct DepartureDate {
    date: NaiveDate,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchCriteria {
    max_flight_offers: u32,
    flight_filters: FlightFilters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FlightFilters {
    cabin_restrictions: Vec<CabinRestriction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CabinRestriction {
    cabin: &'static str,
    coverage: &'static str,
    origin_destination_ids: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FlightOffersResponse {
    #[serde(default)]
    pub data: Vec<RawOffer>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOffer {
    #[serde(default)]
    pub price: Option<RawPrice>,
    #[serde(default)]
    pub validating_airline_codes: Vec<String>,
    #[serde(default)]
    pub itineraries: Vec<RawItinerary>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrice {
    #[serde(default)]
    pub total: Option<String>,
    #[serde(default)]
    pub grand_total: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItinerary {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSegment {
    #[serde(default)]
    pub carrier_code: Option<String>,
}

impl RawOffer {
    /// Numeric total, `None` when missing or unparsable.
    pub fn total(&self) -> Option<f64> {
        let price = self.price.as_ref()?;
        price
            .total
            .as_deref()
            .or(price.grand_total.as_deref())
            .and_then(|t| t.trim().parse::<f64>().ok())
            .filter(|t| t.is_finite())
    }

    fn into_offer(self) -> Offer {
        let total = self.total();
        let carrier_codes = if self.validating_airline_codes.is_empty() {
            let mut codes: Vec<String> = Vec::new();
            for code in self
                .itineraries
                .iter()
                .flat_map(|i| i.segments.iter())
                .filter_map(|s| s.carrier_code.clone())
            {
                if !codes.contains(&code) {
                    codes.push(code);
                }
            }
            codes
        } else {
            self.validating_airline_codes
        };

        Offer {
            total,
            currency: self.price.and_then(|p| p.currency),
            carrier_codes,
            leg_durations: self.itineraries.into_iter().filter_map(|i| i.duration).collect(),
        }
    }
}

/// Cheapest offer by total; offers without a price sort last, ties keep
/// provider order, and an empty list yields `None`.
pub fn pick_cheapest(mut offers: Vec<RawOffer>) -> Option<Offer> {
    let key = |o: &RawOffer| o.total().unwrap_or(f64::INFINITY);
    offers.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));
    offers.into_iter().next().map(RawOffer::into_offer)
}

pub fn multi_leg_ids(legs: &[Leg]) -> Vec<String> {
    (1..=legs.len()).map(|i| i.to_string()).collect()
}

// ---- adapter ----

pub struct FareClient {
    http: ResilientClient,
    tokens: TokenManager,
    config: Arc<ProviderConfig>,
}

impl FareClient {
    pub fn new(http: ResilientClient, config: ProviderConfig, clock: Arc<dyn Clock>) -> Self {
        let config = Arc::new(config);
        let tokens = TokenManager::new(http.clone(), config.clone(), clock);
        Self { http, tokens, config }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn http(&self) -> &ResilientClient {
        &self.http
    }

    fn multi_city_body(&self, legs: &[Leg], params: &PricingParams) -> MultiCityBody {
        let ids = multi_leg_ids(legs);
        let origin_destinations = legs
            .iter()
            .zip(ids.iter())
            .map(|(leg, id)| OriginDestination {
                id: id.clone(),
                origin_location_code: leg.origin.clone(),
                destination_location_code: leg.destination.clone(),
                departure_date_time_range: DepartureDate { date: leg.date },
            })
            .collect();

        MultiCityBody {
            currency_code: params.currency.clone(),
            travelers: (1..=params.traveler_count)
                .map(|i| Traveler {
                    id: i.to_string(),
                    traveler_type: "ADULT",
                })
                .collect(),
            sources: vec!["GDS"],
            origin_destinations,
            search_criteria: SearchCriteria {
                max_flight_offers: self.config.max_offers,
                flight_filters: FlightFilters {
                    cabin_restrictions: vec![CabinRestriction {
                        cabin: params.cabin.as_str(),
                        coverage: "MOST_SEGMENTS",
                        origin_destination_ids: ids,
                    }],
                },
            },
        }
    }

    // Authorize, send through the resilient layer and decode the offer list.
    async fn send(&self, builder: RequestBuilder) -> Result<Vec<RawOffer>, PricingError> {
        let credential = self.tokens.acquire().await?;
        let request = builder
            .bearer_auth(&credential.value)
            .build()
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let response = self
            .http
            .execute(request, &self.config.retry)
            .await
            .map_err(ProviderError::from)?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.invalidate().await;
            }
            let body = self
                .http
                .read_body(response, &self.config.retry)
                .await
                .unwrap_or_default();
            warn!(status = status.as_u16(), "provider rejected pricing query");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = self
            .http
            .read_body(response, &self.config.retry)
            .await
            .map_err(ProviderError::from)?;
        let parsed: FlightOffersResponse =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(parsed.data)
    }
}

#[async_trait]
impl FarePricer for FareClient {
    async fn authorize(&self) -> Result<(), AuthError> {
        self.tokens.acquire().await.map(|_| ())
    }

    async fn price_multi_leg(
        &self,
        route: &Route,
        tuple: &CandidateTuple,
        params: &PricingParams,
    ) -> Result<Option<Offer>, PricingError> {
        let legs = route.legs(tuple);
        let body = self.multi_city_body(&legs, params);
        let builder = self
            .http
            .inner()
            .post(format!("{}{}", self.config.base_url, FLIGHT_OFFERS_PATH))
            .json(&body);

        let offers = self.send(builder).await?;
        debug!(hub = %route.hub, outbound = %tuple.outbound_date, offers = offers.len(), "multi-leg priced");
        Ok(pick_cheapest(offers))
    }

    async fn price_round_trip(
        &self,
        origin: &str,
        destination: &str,
        depart_date: NaiveDate,
        return_date: NaiveDate,
        params: &PricingParams,
    ) -> Result<Option<RoundTripQuote>, PricingError> {
        let builder = self
            .http
            .inner()
            .get(format!("{}{}", self.config.base_url, FLIGHT_OFFERS_PATH))
            .query(&[
                ("originLocationCode", origin.to_string()),
                ("destinationLocationCode", destination.to_string()),
                ("departureDate", depart_date.to_string()),
                ("returnDate", return_date.to_string()),
                ("adults", params.traveler_count.to_string()),
                ("travelClass", params.cabin.as_str().to_string()),
                ("currencyCode", params.currency.clone()),
                ("max", self.config.max_offers.to_string()),
            ]);

        let offers = self.send(builder).await?;
        let offer_count = offers.len();
        debug!(origin, destination, offers = offer_count, "round trip priced");
        Ok(pick_cheapest(offers).map(|offer| RoundTripQuote { offer, offer_count }))
    }
}
