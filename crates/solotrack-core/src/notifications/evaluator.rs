//! Event detection.
//!
//! Runs four independent heuristics over the flight history and returns the
//! candidate events. Order is irrelevant; scoring and rate limiting decide
//! what is actually sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::NotificationEvent;
use super::preferences::{NotificationPreferences, PreferenceStore};
use crate::currency::{CurrencyEngine, CurrencyKind, CurrencyState};
use crate::flight::FlightRecord;
use crate::training::{Requirement, RequirementSummary, TrainingStage};

/// Configuration for event detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Days without flying before a momentum stall is reported
    #[serde(default = "default_stall_after_days")]
    pub stall_after_days: i64,
}

fn default_stall_after_days() -> i64 {
    14
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            stall_after_days: default_stall_after_days(),
        }
    }
}

/// Detects notification-worthy moments.
#[derive(Debug, Clone, Default)]
pub struct NotificationEvaluator {
    config: EvaluatorConfig,
    currency: CurrencyEngine,
    requirements: RequirementSummary,
}

impl NotificationEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: EvaluatorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Use a differently configured currency engine.
    pub fn with_currency_engine(mut self, currency: CurrencyEngine) -> Self {
        self.currency = currency;
        self
    }

    /// Candidate events as of `now`.
    ///
    /// Reads the acknowledged milestones and the checkride-ready flag so
    /// one-time events are not proposed again.
    pub fn detect<S: PreferenceStore>(
        &self,
        flights: &[FlightRecord],
        stage: TrainingStage,
        now: DateTime<Utc>,
        prefs: &NotificationPreferences<S>,
    ) -> Vec<NotificationEvent> {
        let requirements = self.requirements.compute(flights);

        let mut events = self.currency_cliffs(flights, now);
        events.extend(milestones(&requirements, prefs));
        events.extend(checkride_ready(&requirements, prefs));
        events.extend(self.momentum_stall(flights, &requirements, now));

        tracing::debug!(
            stage = %stage,
            flights = flights.len(),
            events = events.len(),
            "detected notification candidates"
        );
        events
    }

    /// Only caution states are worth a nudge: valid has nothing to say and
    /// expired is already shown on the dashboard.
    fn currency_cliffs(&self, flights: &[FlightRecord], now: DateTime<Utc>) -> Vec<NotificationEvent> {
        let as_of = now.date_naive();
        [CurrencyKind::Day, CurrencyKind::Night]
            .into_iter()
            .filter_map(|kind| match self.currency.currency(kind, flights, as_of) {
                CurrencyState::Caution { days_remaining } => Some(NotificationEvent::CurrencyCliff {
                    kind,
                    days_remaining,
                }),
                CurrencyState::Valid { .. } | CurrencyState::Expired { .. } => None,
            })
            .collect()
    }

    fn momentum_stall(
        &self,
        flights: &[FlightRecord],
        requirements: &[Requirement],
        now: DateTime<Utc>,
    ) -> Option<NotificationEvent> {
        let most_recent = flights.iter().map(|f| f.date).max()?;
        // A future-dated flight counts as flown today.
        let days_since = (now.date_naive() - most_recent).num_days().max(0);
        if days_since < self.config.stall_after_days {
            return None;
        }

        let next = requirements
            .iter()
            .filter(|r| !r.is_met())
            .min_by(|a, b| a.remaining_hours().total_cmp(&b.remaining_hours()))?;

        Some(NotificationEvent::MomentumStall {
            days_since_last_flight: days_since,
            next_requirement_title: next.title.clone(),
            remaining_hours: next.remaining_hours(),
        })
    }
}

fn milestones<S: PreferenceStore>(
    requirements: &[Requirement],
    prefs: &NotificationPreferences<S>,
) -> Vec<NotificationEvent> {
    let acknowledged = prefs.acknowledged_milestones();
    requirements
        .iter()
        .filter(|r| r.is_met() && !acknowledged.contains(&r.key))
        .map(|r| NotificationEvent::MilestoneCrossed {
            requirement_title: r.title.clone(),
            requirement_key: r.key.clone(),
        })
        .collect()
}

fn checkride_ready<S: PreferenceStore>(
    requirements: &[Requirement],
    prefs: &NotificationPreferences<S>,
) -> Option<NotificationEvent> {
    if prefs.checkride_ready_notified() {
        return None;
    }
    let all_met = !requirements.is_empty() && requirements.iter().all(Requirement::is_met);
    all_met.then_some(NotificationEvent::CheckrideReady)
}
