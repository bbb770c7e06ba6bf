//! The notification pipeline.
//!
//! detect → score → sort by score → gate → dispatch → record.
//! Gating runs in score order so the daily cap keeps the most valuable
//! events.

use chrono::{DateTime, Utc};

use super::dispatch::Dispatcher;
use super::evaluator::NotificationEvaluator;
use super::event::{NotificationEvent, ScoredEvent};
use super::preferences::{NotificationPreferences, PreferenceStore};
use super::rate_limiter::{RateLimitDecision, RateLimiter};
use super::scorer::NotificationScorer;
use crate::currency::CurrencyEngine;
use crate::error::Result;
use crate::flight::FlightRecord;
use crate::storage::Config;
use crate::training::TrainingStage;

/// Owns the preference state and the dispatcher for one pilot.
pub struct NotificationService<S, D> {
    prefs: NotificationPreferences<S>,
    dispatcher: D,
    evaluator: NotificationEvaluator,
    scorer: NotificationScorer,
    limiter: RateLimiter,
}

impl<S: PreferenceStore, D: Dispatcher> NotificationService<S, D> {
    /// Service with default thresholds.
    pub fn new(store: S, dispatcher: D) -> Self {
        Self {
            prefs: NotificationPreferences::new(store),
            dispatcher,
            evaluator: NotificationEvaluator::new(),
            scorer: NotificationScorer::new(),
            limiter: RateLimiter::new(),
        }
    }

    /// Service with thresholds taken from `config`.
    pub fn with_config(store: S, dispatcher: D, config: &Config) -> Self {
        Self {
            prefs: NotificationPreferences::new(store),
            dispatcher,
            evaluator: NotificationEvaluator::with_config(config.evaluator.clone())
                .with_currency_engine(CurrencyEngine::with_config(config.currency.clone())),
            scorer: NotificationScorer::with_config(config.scoring.clone()),
            limiter: RateLimiter::with_config(config.rate_limits.clone()),
        }
    }

    pub fn preferences(&self) -> &NotificationPreferences<S> {
        &self.prefs
    }

    pub fn preferences_mut(&mut self) -> &mut NotificationPreferences<S> {
        &mut self.prefs
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Detect events in `flights` and run them through the pipeline.
    ///
    /// Call after a flight is saved, on a periodic timer, or when the app
    /// comes to the foreground.
    ///
    /// # Errors
    /// Returns an error if delivery state cannot be persisted.
    pub fn run(
        &mut self,
        flights: &[FlightRecord],
        stage: TrainingStage,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredEvent>> {
        let events = self.evaluator.detect(flights, stage, now, &self.prefs);
        self.evaluate(&events, stage, now)
    }

    /// Score, gate, dispatch and record `events`. Returns what was handed to
    /// the dispatcher, highest score first.
    ///
    /// # Errors
    /// Returns an error if delivery state cannot be persisted.
    pub fn evaluate(
        &mut self,
        events: &[NotificationEvent],
        stage: TrainingStage,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScoredEvent>> {
        let candidates = self.ranked(events, stage);
        let mut delivered = Vec::new();

        for scored in candidates {
            if !self.limiter.passes(&scored.event, now, &self.prefs) {
                continue;
            }

            let outgoing = scored.to_outgoing();
            if let Err(e) = self.dispatcher.dispatch(&outgoing) {
                tracing::warn!(category = %outgoing.category, "dispatch failed: {e}");
            }
            self.limiter.record(&scored.event, now, &mut self.prefs)?;

            tracing::info!(
                category = %outgoing.category,
                score = scored.score,
                "notification delivered"
            );
            delivered.push(scored);
        }

        Ok(delivered)
    }

    /// What [`run`](Self::run) would consider, with each candidate's gate
    /// decision against the current state. Nothing is dispatched or
    /// recorded, so decisions do not account for earlier candidates in the
    /// same batch.
    pub fn preview(
        &self,
        flights: &[FlightRecord],
        stage: TrainingStage,
        now: DateTime<Utc>,
    ) -> Vec<(ScoredEvent, RateLimitDecision)> {
        let events = self.evaluator.detect(flights, stage, now, &self.prefs);
        self.ranked(&events, stage)
            .into_iter()
            .map(|scored| {
                let decision = self.limiter.check(&scored.event, now, &self.prefs);
                (scored, decision)
            })
            .collect()
    }

    fn ranked(&self, events: &[NotificationEvent], stage: TrainingStage) -> Vec<ScoredEvent> {
        let mut scored: Vec<ScoredEvent> = events
            .iter()
            .filter_map(|event| self.scorer.score(event, stage, &self.prefs))
            .collect();
        // Stable: equal scores keep detection order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::CurrencyKind;
    use crate::error::DispatchError;
    use crate::notifications::dispatch::CollectingDispatcher;
    use crate::notifications::event::{NotificationCategory, OutgoingNotification};
    use crate::notifications::preferences::{AlertGroup, MemoryStore};
    use crate::notifications::rate_limiter::RateLimitConfig;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap()
    }

    fn service() -> NotificationService<MemoryStore, CollectingDispatcher> {
        NotificationService::new(MemoryStore::new(), CollectingDispatcher::new())
    }

    fn cliff(days_remaining: i64) -> NotificationEvent {
        NotificationEvent::CurrencyCliff {
            kind: CurrencyKind::Day,
            days_remaining,
        }
    }

    fn stall() -> NotificationEvent {
        NotificationEvent::MomentumStall {
            days_since_last_flight: 20,
            next_requirement_title: "Solo Flight".into(),
            remaining_hours: 4.0,
        }
    }

    #[test]
    fn highest_score_wins_the_last_slot() {
        let mut service = service();
        // One delivery already made today, long enough ago to clear the
        // global cooldown.
        let earlier = now() - Duration::hours(6);
        service.preferences_mut().increment_daily_count(earlier).unwrap();
        service.preferences_mut().set_global_last_sent(earlier).unwrap();

        let heads_up = cliff(20);
        let critical = NotificationEvent::CurrencyCliff {
            kind: CurrencyKind::Night,
            days_remaining: 2,
        };
        let delivered = service
            .evaluate(&[heads_up, critical.clone()], TrainingStage::PostSolo, now())
            .unwrap();

        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].event, critical);
        assert!((delivered[0].score - 0.95).abs() < 1e-9);
        assert_eq!(service.dispatcher().sent().len(), 1);
    }

    #[test]
    fn global_cooldown_limits_batch_to_one() {
        let mut service = service();
        let delivered = service
            .evaluate(&[stall(), cliff(5)], TrainingStage::PostSolo, now())
            .unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].event, cliff(5));
        assert_eq!(service.preferences().notifications_sent_today(now()), 1);
        assert_eq!(
            service.preferences().last_sent(NotificationCategory::CurrencyCliff),
            Some(now())
        );
    }

    #[test]
    fn disabled_group_is_never_dispatched() {
        let mut service = service();
        service
            .preferences_mut()
            .set_alerts_enabled(AlertGroup::Currency, false)
            .unwrap();
        let delivered = service
            .evaluate(&[cliff(1)], TrainingStage::CheckridePrep, now())
            .unwrap();
        assert!(delivered.is_empty());
        assert!(service.dispatcher().sent().is_empty());
    }

    #[test]
    fn checkride_ready_delivered_once() {
        let mut service = service();
        let first = service
            .evaluate(&[NotificationEvent::CheckrideReady], TrainingStage::CheckridePrep, now())
            .unwrap();
        assert_eq!(first.len(), 1);

        for day in 1..=3 {
            let later = now() + Duration::days(day);
            let again = service
                .evaluate(&[NotificationEvent::CheckrideReady], TrainingStage::CheckridePrep, later)
                .unwrap();
            assert!(again.is_empty());
        }
        assert!(service.preferences().checkride_ready_notified());
    }

    #[test]
    fn run_detects_from_flights() {
        let mut service = service();
        // A 75-day gap is also a stall, which would outscore the heads-up.
        service
            .preferences_mut()
            .set_alerts_enabled(AlertGroup::Momentum, false)
            .unwrap();
        let flights = vec![FlightRecord::new(now().date_naive() - Duration::days(75))
            .with_duration(1.2)
            .with_landings(3, 0)];
        let delivered = service.run(&flights, TrainingStage::PostSolo, now()).unwrap();

        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].event, cliff(15));
        let sent = &service.dispatcher().sent()[0];
        assert_eq!(sent.category, "currency_cliff");
        assert!(sent.body.contains("15 days"));
    }

    #[test]
    fn preview_records_nothing() {
        let service = service();
        let flights = vec![FlightRecord::new(now().date_naive() - Duration::days(75))
            .with_duration(1.2)
            .with_landings(3, 0)];
        let preview = service.preview(&flights, TrainingStage::PostSolo, now());

        assert!(!preview.is_empty());
        assert!(preview.iter().all(|(_, d)| d.is_allowed()));
        assert!(service.dispatcher().sent().is_empty());
        assert_eq!(service.preferences().notifications_sent_today(now()), 0);
    }

    struct FailingDispatcher;

    impl Dispatcher for FailingDispatcher {
        fn dispatch(&mut self, n: &OutgoingNotification) -> std::result::Result<(), DispatchError> {
            Err(DispatchError::Refused {
                category: n.category.clone(),
                reason: "not authorized".into(),
            })
        }
    }

    #[test]
    fn failed_dispatch_still_recorded() {
        let mut service = NotificationService::new(MemoryStore::new(), FailingDispatcher);
        let delivered = service
            .evaluate(&[cliff(5)], TrainingStage::PostSolo, now())
            .unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(service.preferences().notifications_sent_today(now()), 1);
    }

    #[test]
    fn config_thresholds_are_applied() {
        let mut config = Config::default();
        config.rate_limits = RateLimitConfig {
            daily_cap: 0,
            ..RateLimitConfig::default()
        };
        let mut service =
            NotificationService::with_config(MemoryStore::new(), CollectingDispatcher::new(), &config);
        let delivered = service
            .evaluate(&[NotificationEvent::CheckrideReady], TrainingStage::CheckridePrep, now())
            .unwrap();
        assert!(delivered.is_empty());
    }
}
