// Core entities shared by the tuple generator, pricing adapter and orchestrator

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

pub const DEFAULT_CURRENCY: &str = "CAD";
pub const DEFAULT_MAX_TUPLES: usize = 30;
pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const MAX_TRAVELERS: u32 = 9;
/// Largest accepted value for any offset or dwell bound, in days.
pub const MAX_RANGE_DAYS: i64 = 365;

/// Inclusive date range, always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[NaiveDate; 2]", into = "[NaiveDate; 2]")]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!("date window start {} is after end {}", start, end));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl TryFrom<[NaiveDate; 2]> for DateWindow {
    type Error = String;

    fn try_from([start, end]: [NaiveDate; 2]) -> Result<Self, Self::Error> {
        DateWindow::new(start, end)
    }
}

impl From<DateWindow> for [NaiveDate; 2] {
    fn from(window: DateWindow) -> Self {
        [window.start, window.end]
    }
}

/// Inclusive integer day range, always `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[i64; 2]", into = "[i64; 2]")]
pub struct OffsetRange {
    min: i64,
    max: i64,
}

impl OffsetRange {
    pub fn new(min: i64, max: i64) -> Result<Self, String> {
        if min > max {
            return Err(format!("range min {} is greater than max {}", min, max));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl TryFrom<[i64; 2]> for OffsetRange {
    type Error = String;

    fn try_from([min, max]: [i64; 2]) -> Result<Self, Self::Error> {
        OffsetRange::new(min, max)
    }
}

impl From<OffsetRange> for [i64; 2] {
    fn from(range: OffsetRange) -> Self {
        [range.min, range.max]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Cabin {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl Cabin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cabin::Economy => "ECONOMY",
            Cabin::PremiumEconomy => "PREMIUM_ECONOMY",
            Cabin::Business => "BUSINESS",
            Cabin::First => "FIRST",
        }
    }
}

/// One concrete 4-leg date assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTuple {
    /// origin -> hub
    pub outbound_date: NaiveDate,
    /// hub -> destination
    pub hub_depart_date: NaiveDate,
    /// destination -> hub
    pub hub_return_date: NaiveDate,
    /// hub -> origin
    pub inbound_date: NaiveDate,
    pub pre_offset: i64,
    pub dwell_days: i64,
    pub post_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leg {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
}

/// origin -> hub -> destination -> hub -> origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub origin: String,
    pub hub: String,
    pub destination: String,
}

impl Route {
    pub fn new(origin: &str, hub: &str, destination: &str) -> Self {
        Self {
            origin: origin.to_string(),
            hub: hub.to_string(),
            destination: destination.to_string(),
        }
    }

    pub fn legs(&self, tuple: &CandidateTuple) -> [Leg; 4] {
        let leg = |from: &str, to: &str, date: NaiveDate| Leg {
            origin: from.to_string(),
            destination: to.to_string(),
            date,
        };
        [
            leg(&self.origin, &self.hub, tuple.outbound_date),
            leg(&self.hub, &self.destination, tuple.hub_depart_date),
            leg(&self.destination, &self.hub, tuple.hub_return_date),
            leg(&self.hub, &self.origin, tuple.inbound_date),
        ]
    }
}

/// A priced itinerary returned by the provider.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub total: Option<f64>,
    pub currency: Option<String>,
    pub carrier_codes: Vec<String>,
    pub leg_durations: Vec<String>,
}

/// Query parameters shared by every pricing call of one search.
#[derive(Debug, Clone, PartialEq)]
pub struct PricingParams {
    pub traveler_count: u32,
    pub currency: String,
    pub cabin: Cabin,
}

impl Default for PricingParams {
    fn default() -> Self {
        Self {
            traveler_count: 1,
            currency: DEFAULT_CURRENCY.to_string(),
            cabin: Cabin::Economy,
        }
    }
}

fn default_offset_range() -> OffsetRange {
    OffsetRange { min: 0, max: 2 }
}

fn default_traveler_count() -> u32 {
    1
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_max_tuples() -> usize {
    DEFAULT_MAX_TUPLES
}

fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_true() -> bool {
    true
}

// Inbound search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub origin: String,
    #[serde(default)]
    pub hub: Option<String>,
    pub destination: String,
    pub depart_window: DateWindow,
    pub return_window: DateWindow,
    #[serde(default = "default_offset_range")]
    pub pre_offset_range: OffsetRange,
    pub dwell_range: OffsetRange,
    #[serde(default = "default_offset_range")]
    pub post_offset_range: OffsetRange,
    #[serde(default = "default_traveler_count")]
    pub traveler_count: u32,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub cabin: Cabin,
    #[serde(default = "default_max_tuples")]
    pub max_tuples: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_true")]
    pub allow_fallback_hubs: bool,
}

impl SearchRequest {
    /// Parse and validate a JSON request body.
    pub fn from_json(body: &str) -> Result<Self, SearchError> {
        let mut request: SearchRequest = serde_json::from_str(body)?;
        request.validate()?;
        Ok(request)
    }

    /// Check every field and normalize airport and currency codes to upper case.
    pub fn validate(&mut self) -> Result<(), SearchError> {
        self.origin = normalize_iata(&self.origin, "origin")?;
        self.destination = normalize_iata(&self.destination, "destination")?;
        self.hub = match self.hub.as_deref() {
            Some(hub) => Some(normalize_iata(hub, "hub")?),
            None => None,
        };

        if self.origin == self.destination {
            return Err(SearchError::Validation(
                "origin and destination must differ".to_string(),
            ));
        }
        if self.hub.is_none() && !self.allow_fallback_hubs {
            return Err(SearchError::Validation(
                "hub is required when fallback hubs are disabled".to_string(),
            ));
        }
        if self.return_window.end() < self.depart_window.start() {
            return Err(SearchError::Validation(
                "returnWindow ends before departWindow starts".to_string(),
            ));
        }
        if self.pre_offset_range.min() < 0 || self.post_offset_range.min() < 0 {
            return Err(SearchError::Validation(
                "preOffsetRange and postOffsetRange must not be negative".to_string(),
            ));
        }
        if self.dwell_range.min() < 0 {
            return Err(SearchError::Validation(
                "dwellRange must not be negative".to_string(),
            ));
        }
        for (name, range) in [
            ("preOffsetRange", self.pre_offset_range),
            ("dwellRange", self.dwell_range),
            ("postOffsetRange", self.post_offset_range),
        ] {
            if range.max() > MAX_RANGE_DAYS {
                return Err(SearchError::Validation(format!(
                    "{} must not exceed {} days",
                    name, MAX_RANGE_DAYS
                )));
            }
        }
        if self.traveler_count == 0 || self.traveler_count > MAX_TRAVELERS {
            return Err(SearchError::Validation(format!(
                "travelerCount must be between 1 and {}",
                MAX_TRAVELERS
            )));
        }
        if self.max_tuples == 0 || self.max_results == 0 {
            return Err(SearchError::Validation(
                "maxTuples and maxResults must be at least 1".to_string(),
            ));
        }

        let currency = self.currency.trim().to_ascii_uppercase();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SearchError::Validation(
                "currency must be a 3-letter code".to_string(),
            ));
        }
        self.currency = currency;

        Ok(())
    }

    pub fn pricing_params(&self) -> PricingParams {
        PricingParams {
            traveler_count: self.traveler_count,
            currency: self.currency.clone(),
            cabin: self.cabin,
        }
    }
}

pub fn normalize_iata(code: &str, label: &str) -> Result<String, SearchError> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(SearchError::Validation(format!(
            "{} must be a 3-letter IATA code",
            label
        )));
    }
    Ok(code)
}

pub(crate) fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    Duration::try_days(days).and_then(|delta| date.checked_add_signed(delta))
}
