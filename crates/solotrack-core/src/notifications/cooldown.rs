//! Time primitives for rate limiting.
//!
//! The daily cap compares calendar days; cooldowns compare elapsed
//! durations. The two are kept apart so midnight never counts as "4 hours".

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Whether `at` falls on calendar day `day` (UTC).
pub fn is_same_calendar_day(day: NaiveDate, at: DateTime<Utc>) -> bool {
    day == at.date_naive()
}

/// Whether at least `duration` has passed between `since` and `now`.
///
/// A `since` later than `now` has not elapsed anything.
pub fn elapsed_at_least(since: DateTime<Utc>, now: DateTime<Utc>, duration: Duration) -> bool {
    now.signed_duration_since(since) >= duration
}

/// Minimum spacing between two deliveries of the same category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cooldown {
    For(Duration),
    /// Once delivered, never again
    Forever,
}

impl Cooldown {
    /// Whether a delivery last made at `last_sent` still blocks one at `now`.
    pub fn blocks(&self, last_sent: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            Cooldown::For(duration) => !elapsed_at_least(last_sent, now, *duration),
            Cooldown::Forever => true,
        }
    }
}
