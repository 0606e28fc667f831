// Result assembler: baseline enrichment, deltas, deeplinks and ranking

use std::cmp::Ordering;

use serde::Serialize;

use crate::{
    baseline::{BaselineFare, BaselineLookup, BaselinePolicy},
    error::SearchError,
    model::{CandidateTuple, Leg, Offer, PricingParams, Route},
    pricing::FarePricer,
};

pub const DEEPLINK_BASE: &str = "https://www.google.com/flights?hl=en#flt=";

/// A priced tuple as collected by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResult {
    pub tuple: CandidateTuple,
    pub route: Route,
    pub offer: Offer,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub tuple: CandidateTuple,
    pub hub: String,
    pub price: Option<f64>,
    pub currency: String,
    pub deeplink: String,
    pub baseline: Option<BaselineFare>,
    pub delta_vs_baseline: Option<f64>,
    pub carrier_codes: Vec<String>,
    pub leg_durations: Vec<String>,
}

/// `AAA.BBB.20260301/BBB.CCC.20260302/...`
pub fn build_deeplink(legs: &[Leg]) -> String {
    let parts: Vec<String> = legs
        .iter()
        .map(|leg| format!("{}.{}.{}", leg.origin, leg.destination, leg.date.format("%Y%m%d")))
        .collect();
    format!("{}{}", DEEPLINK_BASE, parts.join("/"))
}

pub fn delta_vs_baseline(price: Option<f64>, baseline: Option<&BaselineFare>) -> Option<f64> {
    Some(price? - baseline?.total)
}

/// Stable ascending sort by price, unpriced results last.
pub fn rank(results: &mut [SearchResult]) {
    let key = |r: &SearchResult| r.price.unwrap_or(f64::INFINITY);
    results.sort_by(|a, b| key(a).partial_cmp(&key(b)).unwrap_or(Ordering::Equal));
}

pub struct ResultAssembler<'a, P: FarePricer + ?Sized> {
    pricer: &'a P,
    params: &'a PricingParams,
    policy: BaselinePolicy,
}

impl<'a, P: FarePricer + ?Sized> ResultAssembler<'a, P> {
    pub fn new(pricer: &'a P, params: &'a PricingParams, policy: BaselinePolicy) -> Self {
        Self {
            pricer,
            params,
            policy,
        }
    }

    pub async fn assemble(&self, raw: Vec<RawResult>) -> Result<Vec<SearchResult>, SearchError> {
        let Some(first) = raw.first() else {
            return Ok(Vec::new());
        };
        let route = first.route.clone();
        let mut baselines = BaselineLookup::new(
            self.pricer,
            &route.origin,
            &route.destination,
            self.params,
            self.policy,
        );

        let mut results = Vec::with_capacity(raw.len());
        for item in raw {
            let baseline = baselines.fare_for(&item.tuple).await?;
            let legs = item.route.legs(&item.tuple);
            results.push(SearchResult {
                delta_vs_baseline: delta_vs_baseline(item.offer.total, baseline.as_ref()),
                deeplink: build_deeplink(&legs),
                hub: item.route.hub,
                price: item.offer.total,
                currency: item
                    .offer
                    .currency
                    .unwrap_or_else(|| self.params.currency.clone()),
                baseline,
                carrier_codes: item.offer.carrier_codes,
                leg_durations: item.offer.leg_durations,
                tuple: item.tuple,
            });
        }

        rank(&mut results);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::DEFAULT_BASELINE_POLICY;
    use crate::error::{AuthError, PricingError};
    use crate::pricing::RoundTripQuote;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tuple(day: u32) -> CandidateTuple {
        let d = |n: u32| NaiveDate::from_ymd_opt(2026, 3, n).unwrap();
        CandidateTuple {
            outbound_date: d(day),
            hub_depart_date: d(day + 1),
            hub_return_date: d(day + 11),
            inbound_date: d(day + 12),
            pre_offset: 1,
            dwell_days: 10,
            post_offset: 1,
        }
    }

    fn raw(day: u32, total: Option<f64>) -> RawResult {
        RawResult {
            tuple: tuple(day),
            route: Route::new("YUL", "CDG", "BEY"),
            offer: Offer {
                total,
                currency: Some("CAD".to_string()),
                carrier_codes: vec!["AF".to_string()],
                leg_durations: vec![],
            },
        }
    }

    // Baseline only exists for tuples whose destination stay starts on an even day.
    struct EvenDayBaseline;

    #[async_trait]
    impl FarePricer for EvenDayBaseline {
        async fn authorize(&self) -> Result<(), AuthError> {
            Ok(())
        }

        async fn price_multi_leg(
            &self,
            _route: &Route,
            _tuple: &CandidateTuple,
            _params: &PricingParams,
        ) -> Result<Option<Offer>, PricingError> {
            Ok(None)
        }

        async fn price_round_trip(
            &self,
            _origin: &str,
            _destination: &str,
            depart_date: NaiveDate,
            _return_date: NaiveDate,
            _params: &PricingParams,
        ) -> Result<Option<RoundTripQuote>, PricingError> {
            use chrono::Datelike;
            if depart_date.day() % 2 != 0 {
                return Ok(None);
            }
            Ok(Some(RoundTripQuote {
                offer: Offer {
                    total: Some(1000.0),
                    currency: Some("CAD".to_string()),
                    ..Default::default()
                },
                offer_count: 1,
            }))
        }
    }

    #[test]
    fn test_deeplink_chains_legs() {
        let route = Route::new("YUL", "CDG", "ATH");
        let link = build_deeplink(&route.legs(&tuple(1)));
        assert_eq!(
            link,
            "https://www.google.com/flights?hl=en#flt=YUL.CDG.20260301/CDG.ATH.20260302/ATH.CDG.20260312/CDG.YUL.20260313"
        );
    }

    #[test]
    fn test_delta_only_with_both_prices() {
        let fare = BaselineFare {
            total: 800.25,
            currency: "CAD".to_string(),
            approximate: true,
            policy: DEFAULT_BASELINE_POLICY,
        };
        assert_eq!(delta_vs_baseline(Some(1000.5), Some(&fare)), Some(1000.5 - 800.25));
        assert_eq!(delta_vs_baseline(Some(1000.5), None), None);
        assert_eq!(delta_vs_baseline(None, Some(&fare)), None);
    }

    #[tokio::test]
    async fn test_assemble_sorts_stably_and_attaches_baseline() {
        let params = PricingParams::default();
        let assembler = ResultAssembler::new(&EvenDayBaseline, &params, DEFAULT_BASELINE_POLICY);

        let results = assembler
            .assemble(vec![
                raw(1, Some(1200.0)),
                raw(2, None),
                raw(3, Some(900.0)),
                raw(4, Some(1200.0)),
            ])
            .await
            .unwrap();

        let days: Vec<_> = results.iter().map(|r| r.tuple.outbound_date).collect();
        assert_eq!(
            days,
            vec![date("2026-03-03"), date("2026-03-01"), date("2026-03-04"), date("2026-03-02")]
        );

        // outbound 03-01 stays at the destination from 03-02: baseline present
        let first_day = &results[1];
        assert_eq!(first_day.baseline.as_ref().unwrap().total, 1000.0);
        assert_eq!(first_day.delta_vs_baseline, Some(200.0));

        // outbound 03-04 stays from 03-05: no baseline, no delta
        assert!(results[2].baseline.is_none());
        assert_eq!(results[2].delta_vs_baseline, None);
        assert_eq!(results[0].hub, "CDG");
    }

    #[tokio::test]
    async fn test_assemble_empty() {
        let params = PricingParams::default();
        let assembler = ResultAssembler::new(&EvenDayBaseline, &params, DEFAULT_BASELINE_POLICY);
        assert!(assembler.assemble(vec![]).await.unwrap().is_empty());
    }
}
