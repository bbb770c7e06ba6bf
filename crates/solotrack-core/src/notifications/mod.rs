//! Training notifications.
//!
//! Detects high-value moments in a flight log (currency about to lapse, a
//! requirement met, checkride readiness, a long gap in flying), scores them,
//! and delivers at most a couple per day under per-category cooldowns. All
//! delivery state lives behind [`PreferenceStore`].

pub mod cooldown;
pub mod dispatch;
pub mod evaluator;
pub mod event;
pub mod preferences;
pub mod rate_limiter;
pub mod scorer;
pub mod service;

pub use cooldown::Cooldown;
pub use dispatch::{CollectingDispatcher, Dispatcher, LogDispatcher};
pub use evaluator::{EvaluatorConfig, NotificationEvaluator};
pub use event::{NotificationCategory, NotificationEvent, OutgoingNotification, ScoredEvent};
pub use preferences::{
    AlertGroup, MemoryStore, NotificationPreferences, PrefKey, PreferenceStore, PreferencesSnapshot,
};
pub use rate_limiter::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use scorer::{NotificationScorer, ScoringConfig};
pub use service::NotificationService;
