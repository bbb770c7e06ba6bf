//! Notification events and pipeline artifacts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::currency::CurrencyKind;

/// A high-value moment worth telling the pilot about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// Currency entered the caution band
    CurrencyCliff {
        kind: CurrencyKind,
        days_remaining: i64,
    },

    /// A training requirement was met and not yet acknowledged
    MilestoneCrossed {
        requirement_title: String,
        requirement_key: String,
    },

    /// Every training requirement is met
    CheckrideReady,

    /// No recent flying while requirements remain open
    MomentumStall {
        days_since_last_flight: i64,
        next_requirement_title: String,
        remaining_hours: f64,
    },
}

impl NotificationEvent {
    /// Rate-limiting category. Events in the same category share a cooldown.
    pub fn category(&self) -> NotificationCategory {
        match self {
            NotificationEvent::CurrencyCliff { .. } => NotificationCategory::CurrencyCliff,
            NotificationEvent::MilestoneCrossed { .. } => NotificationCategory::MilestoneCrossed,
            NotificationEvent::CheckrideReady => NotificationCategory::CheckrideReady,
            NotificationEvent::MomentumStall { .. } => NotificationCategory::MomentumStall,
        }
    }
}

/// Stable category keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    CurrencyCliff,
    MilestoneCrossed,
    CheckrideReady,
    MomentumStall,
}

impl NotificationCategory {
    pub const ALL: [NotificationCategory; 4] = [
        NotificationCategory::CurrencyCliff,
        NotificationCategory::MilestoneCrossed,
        NotificationCategory::CheckrideReady,
        NotificationCategory::MomentumStall,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationCategory::CurrencyCliff => "currency_cliff",
            NotificationCategory::MilestoneCrossed => "milestone_crossed",
            NotificationCategory::CheckrideReady => "checkride_ready",
            NotificationCategory::MomentumStall => "momentum_stall",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event that cleared scoring, with its copy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEvent {
    pub event: NotificationEvent,
    /// Value score in [0, 1]
    pub score: f64,
    pub title: String,
    pub body: String,
}

impl ScoredEvent {
    pub fn to_outgoing(&self) -> OutgoingNotification {
        OutgoingNotification {
            title: self.title.clone(),
            body: self.body.clone(),
            category: self.event.category().as_str().to_string(),
        }
    }
}

/// What the dispatcher receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingNotification {
    pub title: String,
    pub body: String,
    pub category: String,
}
