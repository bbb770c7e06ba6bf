//! Value scoring and copy.
//!
//! Each event gets a score in [0, 1] from fixed bands, adjusted for the
//! training stage, plus deterministic title/body text carrying the concrete
//! numbers. Events whose opt-in is off, or that score under the send
//! threshold, are dropped.

use serde::{Deserialize, Serialize};

use super::event::{NotificationEvent, ScoredEvent};
use super::preferences::{NotificationPreferences, PreferenceStore};
use crate::currency::CurrencyKind;
use crate::training::TrainingStage;

const CURRENCY_CRITICAL: f64 = 0.95;
const CURRENCY_URGENT: f64 = 0.85;
const CURRENCY_HEADS_UP: f64 = 0.60;
const MILESTONE_BASE: f64 = 0.75;
const CHECKRIDE_READY: f64 = 1.00;
const STALL_BASE: f64 = 0.55;
const STALL_CHECKRIDE_PREP: f64 = 0.75;
const STAGE_BOOST: f64 = 0.10;
const LONG_STALL_BOOST: f64 = 0.10;
const LONG_STALL_DAYS: i64 = 30;

/// Configuration for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Minimum score an event needs to be sent
    #[serde(default = "default_send_threshold")]
    pub send_threshold: f64,
}

fn default_send_threshold() -> f64 {
    0.5
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            send_threshold: default_send_threshold(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationScorer {
    config: ScoringConfig,
}

impl NotificationScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score `event` for a pilot at `stage`.
    ///
    /// Returns `None` when the governing opt-in is disabled (checked first)
    /// or the score is under the send threshold.
    pub fn score<S: PreferenceStore>(
        &self,
        event: &NotificationEvent,
        stage: TrainingStage,
        prefs: &NotificationPreferences<S>,
    ) -> Option<ScoredEvent> {
        let category = event.category();
        if !prefs.category_enabled(category) {
            tracing::debug!(%category, "notification category disabled by user");
            return None;
        }

        let (score, title, body) = score_and_format(event, stage);
        if score < self.config.send_threshold {
            tracing::debug!(%category, score, "score below send threshold");
            return None;
        }

        Some(ScoredEvent {
            event: event.clone(),
            score,
            title,
            body,
        })
    }
}

fn score_and_format(event: &NotificationEvent, stage: TrainingStage) -> (f64, String, String) {
    match event {
        NotificationEvent::CurrencyCliff {
            kind,
            days_remaining,
        } => currency_copy(*kind, *days_remaining),

        NotificationEvent::MilestoneCrossed {
            requirement_title, ..
        } => {
            let boost = if stage == TrainingStage::CheckridePrep {
                STAGE_BOOST
            } else {
                0.0
            };
            (
                MILESTONE_BASE + boost,
                format!("{requirement_title} Complete"),
                format!(
                    "You just met the {requirement_title} requirement. \
                     That's real progress toward your private pilot certificate."
                ),
            )
        }

        NotificationEvent::CheckrideReady => (
            CHECKRIDE_READY,
            "All PPL Requirements Met".to_string(),
            "Every training hour requirement is checked off. \
             Talk to your instructor about scheduling the checkride."
                .to_string(),
        ),

        NotificationEvent::MomentumStall {
            days_since_last_flight,
            next_requirement_title,
            remaining_hours,
        } => {
            let mut score = if stage == TrainingStage::CheckridePrep {
                STALL_CHECKRIDE_PREP
            } else {
                STALL_BASE
            };
            if *days_since_last_flight >= LONG_STALL_DAYS {
                score += LONG_STALL_BOOST;
            }
            (
                score.min(1.0),
                format!("{days_since_last_flight} Days Since Your Last Flight"),
                format!(
                    "You're {remaining_hours:.1} hrs from completing {next_requirement_title}. \
                     Skills stay sharp when the gaps stay short."
                ),
            )
        }
    }
}

fn currency_copy(kind: CurrencyKind, days: i64) -> (f64, String, String) {
    let name = kind.label();
    let lower = name.to_lowercase();
    let landings = match kind {
        CurrencyKind::Day => "3 landings",
        CurrencyKind::Night => "3 night full-stop landings",
    };

    if days <= 3 {
        let body = if days <= 0 {
            format!(
                "Your {lower} currency expires today (0 days left). \
                 One flight with {landings} keeps you legal to carry passengers."
            )
        } else {
            format!(
                "You have {days} {} before your {lower} currency lapses. \
                 One flight with {landings} resets the clock.",
                if days == 1 { "day" } else { "days" }
            )
        };
        (CURRENCY_CRITICAL, format!("{name} Currency Expires in {days}d"), body)
    } else if days <= 7 {
        (
            CURRENCY_URGENT,
            format!("{name} Currency: {days} Days Left"),
            format!(
                "Your {lower} currency expires in {days} days. \
                 Plan a flight this week to stay legal."
            ),
        )
    } else {
        (
            CURRENCY_HEADS_UP,
            "Currency Heads-Up".to_string(),
            format!(
                "Your {lower} currency expires in {days} days. \
                 No rush, but keep it on your radar."
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::preferences::{AlertGroup, MemoryStore};

    fn prefs() -> NotificationPreferences<MemoryStore> {
        NotificationPreferences::new(MemoryStore::new())
    }

    fn cliff(kind: CurrencyKind, days_remaining: i64) -> NotificationEvent {
        NotificationEvent::CurrencyCliff {
            kind,
            days_remaining,
        }
    }

    fn stall(days: i64) -> NotificationEvent {
        NotificationEvent::MomentumStall {
            days_since_last_flight: days,
            next_requirement_title: "Solo Cross-Country".into(),
            remaining_hours: 3.5,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn currency_bands() {
        let scorer = NotificationScorer::new();
        let p = prefs();
        let score = |days| {
            scorer
                .score(&cliff(CurrencyKind::Day, days), TrainingStage::PostSolo, &p)
                .unwrap()
                .score
        };
        assert!(approx(score(0), 0.95));
        assert!(approx(score(3), 0.95));
        assert!(approx(score(4), 0.85));
        assert!(approx(score(7), 0.85));
        assert!(approx(score(8), 0.60));
        assert!(approx(score(30), 0.60));
    }

    #[test]
    fn currency_copy_carries_days() {
        let scorer = NotificationScorer::new();
        let p = prefs();
        let critical = scorer
            .score(&cliff(CurrencyKind::Night, 2), TrainingStage::PreSolo, &p)
            .unwrap();
        assert_eq!(critical.title, "Night Currency Expires in 2d");
        assert!(critical.body.contains("2 days"));
        assert!(critical.body.contains("night full-stop"));

        let urgent = scorer
            .score(&cliff(CurrencyKind::Day, 5), TrainingStage::PreSolo, &p)
            .unwrap();
        assert_eq!(urgent.title, "Day Currency: 5 Days Left");
        assert!(urgent.body.contains("5 days"));

        let heads_up = scorer
            .score(&cliff(CurrencyKind::Day, 20), TrainingStage::PreSolo, &p)
            .unwrap();
        assert_eq!(heads_up.title, "Currency Heads-Up");
        assert!(heads_up.body.contains("20 days"));
    }

    #[test]
    fn milestone_boosted_for_checkride_prep() {
        let scorer = NotificationScorer::new();
        let p = prefs();
        let event = NotificationEvent::MilestoneCrossed {
            requirement_title: "Instrument Training".into(),
            requirement_key: "61.109(a)(3)".into(),
        };
        let post = scorer.score(&event, TrainingStage::PostSolo, &p).unwrap();
        let prep = scorer.score(&event, TrainingStage::CheckridePrep, &p).unwrap();
        assert!(approx(post.score, 0.75));
        assert!(approx(prep.score, 0.85));
        assert_eq!(post.title, "Instrument Training Complete");
        assert!(post.body.contains("Instrument Training"));
    }

    #[test]
    fn checkride_ready_is_maximum() {
        let scored = NotificationScorer::new()
            .score(&NotificationEvent::CheckrideReady, TrainingStage::CheckridePrep, &prefs())
            .unwrap();
        assert_eq!(scored.score, 1.0);
    }

    #[test]
    fn stall_scoring_by_stage_and_length() {
        let scorer = NotificationScorer::new();
        let p = prefs();
        let score = |days, stage| scorer.score(&stall(days), stage, &p).unwrap().score;
        assert!(approx(score(18, TrainingStage::PostSolo), 0.55));
        assert!(approx(score(18, TrainingStage::CheckridePrep), 0.75));
        assert!(approx(score(30, TrainingStage::PreSolo), 0.65));
        assert!(approx(score(45, TrainingStage::CheckridePrep), 0.85));
    }

    #[test]
    fn stall_copy_carries_hours_and_requirement() {
        let scored = NotificationScorer::new()
            .score(&stall(18), TrainingStage::PostSolo, &prefs())
            .unwrap();
        assert_eq!(scored.title, "18 Days Since Your Last Flight");
        assert!(scored.body.contains("3.5 hrs"));
        assert!(scored.body.contains("Solo Cross-Country"));
    }

    #[test]
    fn disabled_category_returns_none_regardless_of_magnitude() {
        let scorer = NotificationScorer::new();
        let mut p = prefs();
        p.set_alerts_enabled(AlertGroup::Currency, false).unwrap();
        assert!(scorer
            .score(&cliff(CurrencyKind::Day, 0), TrainingStage::PostSolo, &p)
            .is_none());

        p.set_alerts_enabled(AlertGroup::Milestone, false).unwrap();
        assert!(scorer
            .score(&NotificationEvent::CheckrideReady, TrainingStage::CheckridePrep, &p)
            .is_none());

        p.set_alerts_enabled(AlertGroup::Momentum, false).unwrap();
        assert!(scorer.score(&stall(60), TrainingStage::CheckridePrep, &p).is_none());
    }

    #[test]
    fn threshold_drops_low_scores() {
        let scorer = NotificationScorer::with_config(ScoringConfig { send_threshold: 0.7 });
        let p = prefs();
        assert!(scorer.score(&stall(18), TrainingStage::PostSolo, &p).is_none());
        assert!(scorer
            .score(&cliff(CurrencyKind::Day, 20), TrainingStage::PostSolo, &p)
            .is_none());
        assert!(scorer
            .score(&cliff(CurrencyKind::Day, 5), TrainingStage::PostSolo, &p)
            .is_some());
    }
}
