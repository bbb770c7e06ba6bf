//! Passenger-carrying currency (FAR 61.57).
//!
//! - Day currency: 3 takeoffs and landings in the preceding 90 days.
//! - Night currency: 3 full-stop night landings in the preceding 90 days.
//!
//! The calculation is a pure function of the flight history and a reference
//! date. The window is right-anchored: expiry is derived from the most recent
//! flights that add up to the required landings, so currency lasts as long
//! as the log can justify.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::flight::FlightRecord;

/// Which currency is being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrencyKind {
    Day,
    Night,
}

impl CurrencyKind {
    /// Landings on `flight` that count toward this kind. Day and night
    /// landings never substitute for each other.
    pub fn landings(self, flight: &FlightRecord) -> u32 {
        match self {
            CurrencyKind::Day => flight.day_landings,
            CurrencyKind::Night => flight.night_full_stop_landings,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CurrencyKind::Day => "Day",
            CurrencyKind::Night => "Night",
        }
    }
}

/// Currency status at a reference date. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CurrencyState {
    /// Current with more than the caution threshold left
    Valid { days_remaining: i64 },
    /// Current, expiring within the caution threshold
    Caution { days_remaining: i64 },
    /// Not current. `days_since` is 0 when currency was never established.
    Expired { days_since: i64 },
}

impl CurrencyState {
    /// Whether the pilot may carry passengers.
    pub fn is_legal(&self) -> bool {
        !matches!(self, CurrencyState::Expired { .. })
    }

    pub fn label(&self) -> String {
        match self {
            CurrencyState::Valid { days_remaining } => {
                format!("Current: {days_remaining} days remaining")
            }
            CurrencyState::Caution { days_remaining } => {
                format!("Expiring in {days_remaining} days")
            }
            CurrencyState::Expired { days_since } => format!("Expired {days_since} days ago"),
        }
    }

    pub fn short_label(&self) -> String {
        match self {
            CurrencyState::Valid { days_remaining } | CurrencyState::Caution { days_remaining } => {
                format!("Expires in {days_remaining}d")
            }
            CurrencyState::Expired { days_since } => format!("Expired {days_since}d ago"),
        }
    }
}

/// Day and night currency side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyStatus {
    pub as_of: NaiveDate,
    pub day: CurrencyState,
    pub night: CurrencyState,
}

/// Configuration for the currency rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Length of the trailing window (days)
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Landings needed inside the window
    #[serde(default = "default_required_landings")]
    pub required_landings: u32,

    /// Days remaining at or below which currency is reported as caution
    #[serde(default = "default_caution_threshold_days")]
    pub caution_threshold_days: i64,
}

fn default_lookback_days() -> i64 {
    90
}
fn default_required_landings() -> u32 {
    3
}
fn default_caution_threshold_days() -> i64 {
    30
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            required_landings: default_required_landings(),
            caution_threshold_days: default_caution_threshold_days(),
        }
    }
}

/// Rolling-window currency calculator.
#[derive(Debug, Clone, Default)]
pub struct CurrencyEngine {
    config: CurrencyConfig,
}

impl CurrencyEngine {
    /// Create an engine with the regulatory defaults (90 days, 3 landings).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: CurrencyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CurrencyConfig {
        &self.config
    }

    pub fn day_currency(&self, flights: &[FlightRecord], as_of: NaiveDate) -> CurrencyState {
        self.currency(CurrencyKind::Day, flights, as_of)
    }

    pub fn night_currency(&self, flights: &[FlightRecord], as_of: NaiveDate) -> CurrencyState {
        self.currency(CurrencyKind::Night, flights, as_of)
    }

    /// Day and night currency for the same reference date.
    pub fn status(&self, flights: &[FlightRecord], as_of: NaiveDate) -> CurrencyStatus {
        CurrencyStatus {
            as_of,
            day: self.day_currency(flights, as_of),
            night: self.night_currency(flights, as_of),
        }
    }

    /// Compute `kind` currency as of `as_of`.
    ///
    /// Flights dated after `as_of` are ignored. Same-date flights are
    /// scanned in input order.
    pub fn currency(
        &self,
        kind: CurrencyKind,
        flights: &[FlightRecord],
        as_of: NaiveDate,
    ) -> CurrencyState {
        let Some(lookback) = self.lookback() else {
            return CurrencyState::Expired { days_since: 0 };
        };
        let Some(window_start) = as_of.checked_sub_signed(lookback) else {
            return CurrencyState::Expired { days_since: 0 };
        };

        let future = flights.iter().filter(|f| f.date > as_of).count();
        if future > 0 {
            tracing::debug!(
                kind = kind.label(),
                %as_of,
                future,
                "ignoring flights dated after the reference date"
            );
        }

        let mut in_window: Vec<&FlightRecord> = flights
            .iter()
            .filter(|f| f.date >= window_start && f.date <= as_of)
            .collect();

        let total: u64 = in_window.iter().map(|f| u64::from(kind.landings(f))).sum();
        if total < u64::from(self.config.required_landings) {
            return self.lapsed_state(kind, flights, as_of);
        }

        // Most recent first; stable so same-date flights keep input order.
        in_window.sort_by(|a, b| b.date.cmp(&a.date));

        let mut accumulated: u64 = 0;
        let mut anchor = None;
        for flight in &in_window {
            accumulated += u64::from(kind.landings(flight));
            if accumulated >= u64::from(self.config.required_landings) {
                anchor = Some(flight.date);
                break;
            }
        }

        let expiration = anchor.and_then(|date| date.checked_add_signed(lookback));
        match expiration {
            Some(expiration) => self.state_from_expiration(expiration, as_of),
            None => CurrencyState::Expired { days_since: 0 },
        }
    }

    /// State when the window does not hold enough landings.
    ///
    /// Measures how long ago currency could at best have lapsed, based on the
    /// most recent qualifying flight in the whole history.
    fn lapsed_state(
        &self,
        kind: CurrencyKind,
        flights: &[FlightRecord],
        as_of: NaiveDate,
    ) -> CurrencyState {
        let last_qualifying = flights
            .iter()
            .filter(|f| f.date <= as_of && kind.landings(f) > 0)
            .map(|f| f.date)
            .max();

        let Some(last_date) = last_qualifying else {
            return CurrencyState::Expired { days_since: 0 };
        };
        let Some(last_possible_expiry) = self
            .lookback()
            .and_then(|lookback| last_date.checked_add_signed(lookback))
        else {
            return CurrencyState::Expired { days_since: 0 };
        };

        if last_possible_expiry < as_of {
            CurrencyState::Expired {
                days_since: (as_of - last_possible_expiry).num_days(),
            }
        } else {
            CurrencyState::Expired { days_since: 0 }
        }
    }

    /// The window length, or `None` when it cannot be represented.
    fn lookback(&self) -> Option<Duration> {
        if self.config.lookback_days < 0 {
            return None;
        }
        Duration::try_days(self.config.lookback_days)
    }

    fn state_from_expiration(&self, expiration: NaiveDate, as_of: NaiveDate) -> CurrencyState {
        let days_remaining = (expiration - as_of).num_days();
        if days_remaining < 0 {
            CurrencyState::Expired {
                days_since: -days_remaining,
            }
        } else if days_remaining <= self.config.caution_threshold_days {
            CurrencyState::Caution { days_remaining }
        } else {
            CurrencyState::Valid { days_remaining }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn flight(days_ago: i64, day: u32, night: u32) -> FlightRecord {
        FlightRecord::new(today() - Duration::days(days_ago))
            .with_duration(1.0)
            .with_landings(day, night)
    }

    #[test]
    fn no_flights_is_expired_zero() {
        let engine = CurrencyEngine::new();
        assert_eq!(
            engine.day_currency(&[], today()),
            CurrencyState::Expired { days_since: 0 }
        );
        assert_eq!(
            engine.night_currency(&[], today()),
            CurrencyState::Expired { days_since: 0 }
        );
    }

    #[test]
    fn three_landings_today_is_valid_for_ninety_days() {
        let engine = CurrencyEngine::new();
        let state = engine.day_currency(&[flight(0, 3, 0)], today());
        assert_eq!(state, CurrencyState::Valid { days_remaining: 90 });
        assert!(state.is_legal());
    }

    #[test]
    fn landings_eighty_days_ago_are_caution() {
        let engine = CurrencyEngine::new();
        let state = engine.day_currency(&[flight(80, 3, 0)], today());
        assert_eq!(state, CurrencyState::Caution { days_remaining: 10 });
        assert!(state.is_legal());
    }

    #[test]
    fn caution_boundary_is_inclusive() {
        let engine = CurrencyEngine::new();
        assert_eq!(
            engine.day_currency(&[flight(60, 3, 0)], today()),
            CurrencyState::Caution { days_remaining: 30 }
        );
        assert_eq!(
            engine.day_currency(&[flight(59, 3, 0)], today()),
            CurrencyState::Valid { days_remaining: 31 }
        );
    }

    #[test]
    fn last_day_of_window_is_caution_zero() {
        let engine = CurrencyEngine::new();
        assert_eq!(
            engine.day_currency(&[flight(90, 3, 0)], today()),
            CurrencyState::Caution { days_remaining: 0 }
        );
    }

    #[test]
    fn landings_ninety_one_days_ago_are_expired() {
        let engine = CurrencyEngine::new();
        let state = engine.day_currency(&[flight(91, 3, 0)], today());
        assert_eq!(state, CurrencyState::Expired { days_since: 1 });
        assert!(!state.is_legal());
    }

    #[test]
    fn insufficient_landings_in_window_never_established() {
        let engine = CurrencyEngine::new();
        let flights = vec![flight(10, 1, 0), flight(20, 1, 0)];
        assert_eq!(
            engine.day_currency(&flights, today()),
            CurrencyState::Expired { days_since: 0 }
        );
    }

    #[test]
    fn lapsed_currency_counts_days_since_last_possible_expiry() {
        let engine = CurrencyEngine::new();
        // One landing 100 days ago, nothing since: best case lapsed 10 days ago.
        let state = engine.day_currency(&[flight(100, 1, 0)], today());
        assert_eq!(state, CurrencyState::Expired { days_since: 10 });
    }

    #[test]
    fn landings_accumulate_across_flights() {
        let engine = CurrencyEngine::new();
        let flights = vec![flight(5, 1, 0), flight(10, 1, 0), flight(15, 1, 0)];
        // Anchor is the third most recent landing, 15 days ago.
        assert_eq!(
            engine.day_currency(&flights, today()),
            CurrencyState::Valid { days_remaining: 75 }
        );
    }

    #[test]
    fn window_is_right_anchored() {
        let engine = CurrencyEngine::new();
        // Older flights would expire sooner; the recent three decide.
        let flights = vec![
            flight(85, 3, 0),
            flight(30, 1, 0),
            flight(20, 1, 0),
            flight(10, 1, 0),
        ];
        assert_eq!(
            engine.day_currency(&flights, today()),
            CurrencyState::Valid { days_remaining: 60 }
        );
    }

    #[test]
    fn input_order_does_not_change_result() {
        let engine = CurrencyEngine::new();
        let mut flights = vec![flight(40, 2, 0), flight(5, 1, 0), flight(70, 4, 0)];
        let forward = engine.day_currency(&flights, today());
        flights.reverse();
        assert_eq!(engine.day_currency(&flights, today()), forward);
        assert_eq!(forward, CurrencyState::Valid { days_remaining: 50 });
    }

    #[test]
    fn landings_outside_window_never_count() {
        let engine = CurrencyEngine::new();
        let flights = vec![flight(95, 2, 0), flight(3, 1, 0)];
        assert!(!engine.day_currency(&flights, today()).is_legal());
    }

    #[test]
    fn night_and_day_landings_are_independent() {
        let engine = CurrencyEngine::new();
        let day_only = vec![flight(0, 10, 0)];
        assert!(!engine.night_currency(&day_only, today()).is_legal());

        let night_only = vec![flight(0, 0, 3)];
        assert!(engine.night_currency(&night_only, today()).is_legal());
        assert!(!engine.day_currency(&night_only, today()).is_legal());
    }

    #[test]
    fn future_flights_are_ignored() {
        let engine = CurrencyEngine::new();
        let flights = vec![flight(-5, 3, 0)];
        assert_eq!(
            engine.day_currency(&flights, today()),
            CurrencyState::Expired { days_since: 0 }
        );
    }

    #[test]
    fn custom_config_changes_threshold() {
        let engine = CurrencyEngine::with_config(CurrencyConfig {
            lookback_days: 90,
            required_landings: 1,
            caution_threshold_days: 10,
        });
        assert_eq!(
            engine.day_currency(&[flight(70, 1, 0)], today()),
            CurrencyState::Valid { days_remaining: 20 }
        );
    }

    #[test]
    fn date_overflow_degrades_to_never_established() {
        let engine = CurrencyEngine::new();
        let at_min = FlightRecord::new(NaiveDate::MIN).with_landings(3, 3);
        assert_eq!(
            engine.day_currency(&[at_min], NaiveDate::MIN),
            CurrencyState::Expired { days_since: 0 }
        );

        let at_max = FlightRecord::new(NaiveDate::MAX).with_landings(3, 3);
        assert_eq!(
            engine.night_currency(&[at_max.clone()], NaiveDate::MAX),
            CurrencyState::Expired { days_since: 0 }
        );
        // Lapsed path: not enough landings, last one at the end of time.
        let single = at_max.with_landings(1, 0);
        assert_eq!(
            engine.day_currency(&[single], NaiveDate::MAX),
            CurrencyState::Expired { days_since: 0 }
        );
    }

    #[test]
    fn unrepresentable_lookback_never_panics() {
        for lookback_days in [i64::MAX, i64::MIN, -1] {
            let engine = CurrencyEngine::with_config(CurrencyConfig {
                lookback_days,
                ..CurrencyConfig::default()
            });
            assert_eq!(
                engine.day_currency(&[flight(1, 3, 0)], today()),
                CurrencyState::Expired { days_since: 0 }
            );
            assert_eq!(
                engine.day_currency(&[flight(1, 1, 0)], today()),
                CurrencyState::Expired { days_since: 0 }
            );
        }
    }

    #[test]
    fn status_reports_both_kinds() {
        let engine = CurrencyEngine::new();
        let status = engine.status(&[flight(0, 3, 0)], today());
        assert!(status.day.is_legal());
        assert!(!status.night.is_legal());
        assert_eq!(status.as_of, today());
    }

    #[test]
    fn labels_include_day_counts() {
        assert_eq!(
            CurrencyState::Caution { days_remaining: 12 }.label(),
            "Expiring in 12 days"
        );
        assert_eq!(
            CurrencyState::Expired { days_since: 4 }.short_label(),
            "Expired 4d ago"
        );
    }

    #[test]
    fn state_serializes_with_tag() {
        let json = serde_json::to_value(CurrencyState::Caution { days_remaining: 7 }).unwrap();
        assert_eq!(json["state"], "caution");
        assert_eq!(json["days_remaining"], 7);
    }
}
