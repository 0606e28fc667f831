// Tuple generator: lazy enumeration of candidate 4-leg date assignments
//
// Iteration order is (depart day, pre offset, dwell, post offset), all ascending.
// Truncation by `max_tuples` therefore always keeps the same prefix.

use chrono::NaiveDate;

use crate::model::{add_days, CandidateTuple, DateWindow, OffsetRange, SearchRequest};

pub const DEFAULT_MAX_DEPART_DAYS: i64 = 31;

#[derive(Debug, Clone, PartialEq)]
pub struct TupleConstraints {
    pub depart_window: DateWindow,
    pub return_window: DateWindow,
    pub pre_offset_range: OffsetRange,
    pub dwell_range: OffsetRange,
    pub post_offset_range: OffsetRange,
    pub max_tuples: usize,
    pub max_depart_days: i64,
}

impl TupleConstraints {
    pub fn from_request(request: &SearchRequest, max_depart_days: i64) -> Self {
        Self {
            depart_window: request.depart_window,
            return_window: request.return_window,
            pre_offset_range: request.pre_offset_range,
            dwell_range: request.dwell_range,
            post_offset_range: request.post_offset_range,
            max_tuples: request.max_tuples,
            max_depart_days,
        }
    }

    /// Depart days actually iterated, after clamping to `max_depart_days`.
    pub fn depart_days(&self) -> i64 {
        self.depart_window.days().clamp(1, self.max_depart_days.max(1))
    }

    /// Dwell values actually iterated. A zero-night dwell is the same trip as
    /// a one-night dwell, so the sweep starts at 1.
    pub fn dwell_bounds(&self) -> (i64, i64) {
        let min = self.dwell_range.min().max(1);
        (min, self.dwell_range.max().max(min))
    }
}

/// Start a fresh enumeration. Calling it twice yields identical sequences.
pub fn generate(constraints: &TupleConstraints) -> CandidateTuples<'_> {
    CandidateTuples::new(constraints)
}

// Cursor over the cross product, advanced like an odometer with y as the
// fastest digit.
#[derive(Debug, Clone)]
pub struct CandidateTuples<'a> {
    constraints: &'a TupleConstraints,
    day: i64,
    x: i64,
    z: i64,
    y: i64,
    produced: usize,
    examined: usize,
    overflowed: bool,
    done: bool,
}

impl<'a> CandidateTuples<'a> {
    fn new(constraints: &'a TupleConstraints) -> Self {
        Self {
            constraints,
            day: 0,
            x: constraints.pre_offset_range.min(),
            z: constraints.dwell_bounds().0,
            y: constraints.post_offset_range.min(),
            produced: 0,
            examined: 0,
            overflowed: false,
            done: constraints.max_tuples == 0,
        }
    }

    pub fn produced(&self) -> usize {
        self.produced
    }

    /// Candidates whose dates were computed, kept or not.
    pub fn examined(&self) -> usize {
        self.examined
    }

    /// True when enumeration stopped because a date fell outside the calendar.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    fn advance_y(&mut self) {
        self.y += 1;
        if self.y > self.constraints.post_offset_range.max() {
            self.advance_z();
        }
    }

    fn advance_z(&mut self) {
        self.skip_dwell(1);
    }

    fn skip_dwell(&mut self, by: i64) {
        self.y = self.constraints.post_offset_range.min();
        self.z = self.z.saturating_add(by);
        if self.z > self.constraints.dwell_bounds().1 {
            self.advance_x();
        }
    }

    fn advance_x(&mut self) {
        self.y = self.constraints.post_offset_range.min();
        self.z = self.constraints.dwell_bounds().0;
        self.x += 1;
        if self.x > self.constraints.pre_offset_range.max() {
            self.x = self.constraints.pre_offset_range.min();
            self.day += 1;
        }
    }

    fn candidate(&self) -> Option<CandidateTuple> {
        let c = self.constraints;
        let dwell = self.z;
        let outbound_date = add_days(c.depart_window.start(), self.day)?;
        let hub_depart_date = add_days(outbound_date, self.x.max(0))?;
        let hub_return_date = add_days(hub_depart_date, dwell)?;
        let inbound_date = add_days(hub_return_date, self.y.max(0))?;

        Some(CandidateTuple {
            outbound_date,
            hub_depart_date,
            hub_return_date,
            inbound_date,
            pre_offset: self.x,
            dwell_days: dwell,
            post_offset: self.y,
        })
    }
}

impl Iterator for CandidateTuples<'_> {
    type Item = CandidateTuple;

    fn next(&mut self) -> Option<Self::Item> {
        let window: DateWindow = self.constraints.return_window;
        let depart_days = self.constraints.depart_days();

        while !self.done {
            if self.produced >= self.constraints.max_tuples || self.day >= depart_days {
                self.done = true;
                break;
            }

            self.examined += 1;
            let Some(tuple) = self.candidate() else {
                self.overflowed = true;
                self.done = true;
                break;
            };

            if window.contains(tuple.inbound_date) {
                self.advance_y();
                self.produced += 1;
                return Some(tuple);
            }

            // Inbound grows with both y and z. Past the window end at the
            // smallest y, every larger dwell misses as well.
            let first_y = self.y == self.constraints.post_offset_range.min();
            if tuple.inbound_date > window.end() {
                if first_y {
                    self.advance_x();
                } else {
                    self.advance_z();
                }
            } else if first_y {
                // Short of the window start: jump to the first dwell whose
                // y sweep can reach it.
                let reach = self.constraints.post_offset_range.max() - self.y;
                let gap = (window.start() - tuple.inbound_date).num_days() - reach;
                if gap > 0 {
                    self.skip_dwell(gap);
                } else {
                    self.advance_y();
                }
            } else {
                self.advance_y();
            }
        }
        None
    }
}

/// True when a tuple satisfies every ordering, dwell, offset and window rule.
pub fn satisfies(tuple: &CandidateTuple, constraints: &TupleConstraints) -> bool {
    let ordered = |a: NaiveDate, b: NaiveDate| a <= b;
    ordered(tuple.outbound_date, tuple.hub_depart_date)
        && tuple.hub_depart_date < tuple.hub_return_date
        && ordered(tuple.hub_return_date, tuple.inbound_date)
        && tuple.dwell_days >= 1
        && constraints.pre_offset_range.contains(tuple.pre_offset)
        && constraints.post_offset_range.contains(tuple.post_offset)
        && constraints.depart_window.contains(tuple.outbound_date)
        && constraints.return_window.contains(tuple.inbound_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow::new(date(start), date(end)).unwrap()
    }

    fn range(min: i64, max: i64) -> OffsetRange {
        OffsetRange::new(min, max).unwrap()
    }

    fn scenario(max_tuples: usize) -> TupleConstraints {
        TupleConstraints {
            depart_window: window("2026-03-01", "2026-03-03"),
            return_window: window("2026-03-20", "2026-03-22"),
            pre_offset_range: range(0, 1),
            dwell_range: range(10, 12),
            post_offset_range: range(0, 1),
            max_tuples,
            max_depart_days: DEFAULT_MAX_DEPART_DAYS,
        }
    }

    // Straight nested loops, used as the reference ordering.
    fn brute_force(c: &TupleConstraints) -> Vec<CandidateTuple> {
        let mut out = Vec::new();
        for d in 0..c.depart_days() {
            for x in c.pre_offset_range.min()..=c.pre_offset_range.max() {
                let (dwell_min, dwell_max) = c.dwell_bounds();
                for z in dwell_min..=dwell_max {
                    for y in c.post_offset_range.min()..=c.post_offset_range.max() {
                        let outbound = add_days(c.depart_window.start(), d).unwrap();
                        let hub_depart = add_days(outbound, x).unwrap();
                        let hub_return = add_days(hub_depart, z).unwrap();
                        let inbound = add_days(hub_return, y).unwrap();
                        if !c.return_window.contains(inbound) {
                            continue;
                        }
                        out.push(CandidateTuple {
                            outbound_date: outbound,
                            hub_depart_date: hub_depart,
                            hub_return_date: hub_return,
                            inbound_date: inbound,
                            pre_offset: x,
                            dwell_days: z,
                            post_offset: y,
                        });
                        if out.len() >= c.max_tuples {
                            return out;
                        }
                    }
                }
            }
        }
        out
    }

    fn reachable(max_tuples: usize) -> TupleConstraints {
        TupleConstraints {
            dwell_range: range(16, 19),
            ..scenario(max_tuples)
        }
    }

    #[test]
    fn test_scenario_tuples_respect_bounds() {
        let constraints = scenario(30);
        let tuples: Vec<_> = generate(&constraints).collect();

        // Latest possible inbound is 03-03 + 1 + 12 + 1 = 03-17, short of the window
        assert!(tuples.is_empty());
        for tuple in &tuples {
            assert!(satisfies(tuple, &constraints), "bad tuple {:?}", tuple);
            assert!((10..=12).contains(&tuple.dwell_days));
        }
    }

    #[test]
    fn test_reachable_tuples_respect_bounds() {
        let constraints = reachable(30);
        let tuples: Vec<_> = generate(&constraints).collect();

        assert!(!tuples.is_empty());
        assert!(tuples.len() <= 30);
        for tuple in &tuples {
            assert!(satisfies(tuple, &constraints), "bad tuple {:?}", tuple);
            assert!((16..=19).contains(&tuple.dwell_days));
            assert!(tuple.inbound_date >= date("2026-03-20"));
            assert!(tuple.inbound_date <= date("2026-03-22"));
        }
    }

    #[test]
    fn test_first_tuple_is_earliest_in_order() {
        let constraints = reachable(30);
        let first = generate(&constraints).next().unwrap();

        assert_eq!(first.outbound_date, date("2026-03-01"));
        assert_eq!(first.pre_offset, 0);
        assert_eq!(first.dwell_days, 18);
        assert_eq!(first.post_offset, 1);
        assert_eq!(first.inbound_date, date("2026-03-20"));
    }

    #[test]
    fn test_matches_reference_ordering() {
        for max in [1, 3, 7, 30, 500] {
            let constraints = reachable(max);
            let lazy: Vec<_> = generate(&constraints).collect();
            assert_eq!(lazy, brute_force(&constraints), "max_tuples = {}", max);
        }
    }

    #[test]
    fn test_cap_and_determinism() {
        let constraints = reachable(4);
        let first: Vec<_> = generate(&constraints).collect();
        let second: Vec<_> = generate(&constraints).collect();

        assert_eq!(first.len(), 4);
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_dwell_is_clamped_to_one_night() {
        let constraints = TupleConstraints {
            depart_window: window("2026-05-01", "2026-05-01"),
            return_window: window("2026-05-01", "2026-05-10"),
            pre_offset_range: range(0, 0),
            dwell_range: range(0, 0),
            post_offset_range: range(0, 0),
            max_tuples: 10,
            max_depart_days: DEFAULT_MAX_DEPART_DAYS,
        };
        let tuples: Vec<_> = generate(&constraints).collect();

        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].dwell_days, 1);
        assert_eq!(tuples[0].hub_return_date, date("2026-05-02"));
    }

    #[test]
    fn test_long_depart_window_is_clamped() {
        let constraints = TupleConstraints {
            depart_window: window("2026-01-01", "2026-12-31"),
            return_window: window("2026-01-01", "2027-12-31"),
            pre_offset_range: range(0, 0),
            dwell_range: range(1, 1),
            post_offset_range: range(0, 0),
            max_tuples: 1_000,
            max_depart_days: DEFAULT_MAX_DEPART_DAYS,
        };
        let tuples: Vec<_> = generate(&constraints).collect();

        assert_eq!(constraints.depart_days(), 31);
        assert_eq!(tuples.len(), 31);
        assert_eq!(tuples.last().unwrap().outbound_date, date("2026-01-31"));
    }

    #[test]
    fn test_unreachable_return_window_yields_nothing() {
        let constraints = TupleConstraints {
            return_window: window("2026-02-01", "2026-02-05"),
            ..scenario(30)
        };
        assert_eq!(generate(&constraints).count(), 0);
    }

    #[test]
    fn test_wide_dwell_range_does_bounded_work() {
        let wide = TupleConstraints {
            dwell_range: range(16, 20_000_000),
            ..scenario(30)
        };
        let mut tuples = generate(&wide);
        let collected: Vec<_> = tuples.by_ref().collect();

        // Nothing above 21 nights can land inbound by 03-22
        let narrow = TupleConstraints {
            dwell_range: range(16, 21),
            ..scenario(30)
        };
        assert_eq!(collected, brute_force(&narrow));
        assert!(tuples.examined() < 200, "examined {}", tuples.examined());
    }

    #[test]
    fn test_zero_min_dwell_does_not_repeat_one_night() {
        let constraints = TupleConstraints {
            depart_window: window("2026-05-01", "2026-05-01"),
            return_window: window("2026-05-01", "2026-05-10"),
            pre_offset_range: range(0, 0),
            dwell_range: range(0, 2),
            post_offset_range: range(0, 0),
            max_tuples: 10,
            max_depart_days: DEFAULT_MAX_DEPART_DAYS,
        };
        let dwells: Vec<_> = generate(&constraints).map(|t| t.dwell_days).collect();

        assert_eq!(dwells, vec![1, 2]);
    }

    #[test]
    fn test_calendar_overflow_is_flagged() {
        let last = NaiveDate::MAX;
        let constraints = TupleConstraints {
            depart_window: DateWindow::new(last, last).unwrap(),
            return_window: DateWindow::new(last, last).unwrap(),
            pre_offset_range: range(0, 0),
            dwell_range: range(1, 1),
            post_offset_range: range(0, 0),
            max_tuples: 10,
            max_depart_days: DEFAULT_MAX_DEPART_DAYS,
        };
        let mut tuples = generate(&constraints);

        assert!(tuples.next().is_none());
        assert!(tuples.overflowed());
    }
}
