//! Rate limiting over persisted cooldown state.
//!
//! Gates are checked in order and all must pass:
//!
//! 1. **Daily cap**: at most `daily_cap` deliveries per calendar day
//! 2. **Global cooldown**: minimum gap since any delivery
//! 3. **Category cooldown**: minimum gap since the last delivery in the
//!    same category (`checkride_ready` is forever)
//! 4. **One-time dedup**: checkride-ready once ever, each milestone once

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::cooldown::Cooldown;
use super::event::{NotificationCategory, NotificationEvent};
use super::preferences::{NotificationPreferences, PreferenceStore};
use crate::error::Result;

/// Configuration for rate limiting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum deliveries per calendar day
    #[serde(default = "default_daily_cap")]
    pub daily_cap: u32,

    /// Minimum gap between any two deliveries (hours)
    #[serde(default = "default_global_cooldown_hours")]
    pub global_cooldown_hours: i64,

    #[serde(default = "default_currency_cliff_cooldown_days")]
    pub currency_cliff_cooldown_days: i64,

    #[serde(default = "default_milestone_cooldown_hours")]
    pub milestone_cooldown_hours: i64,

    #[serde(default = "default_momentum_stall_cooldown_days")]
    pub momentum_stall_cooldown_days: i64,
}

fn default_daily_cap() -> u32 {
    2
}
fn default_global_cooldown_hours() -> i64 {
    4
}
fn default_currency_cliff_cooldown_days() -> i64 {
    7
}
fn default_milestone_cooldown_hours() -> i64 {
    24
}
fn default_momentum_stall_cooldown_days() -> i64 {
    14
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            daily_cap: default_daily_cap(),
            global_cooldown_hours: default_global_cooldown_hours(),
            currency_cliff_cooldown_days: default_currency_cliff_cooldown_days(),
            milestone_cooldown_hours: default_milestone_cooldown_hours(),
            momentum_stall_cooldown_days: default_momentum_stall_cooldown_days(),
        }
    }
}

impl RateLimitConfig {
    /// Minimum gap since any delivery.
    pub fn global_cooldown(&self) -> Cooldown {
        cooldown_of(self.global_cooldown_hours, Duration::try_hours)
    }

    pub fn cooldown(&self, category: NotificationCategory) -> Cooldown {
        match category {
            NotificationCategory::CurrencyCliff => {
                cooldown_of(self.currency_cliff_cooldown_days, Duration::try_days)
            }
            NotificationCategory::MilestoneCrossed => {
                cooldown_of(self.milestone_cooldown_hours, Duration::try_hours)
            }
            NotificationCategory::CheckrideReady => Cooldown::Forever,
            NotificationCategory::MomentumStall => {
                cooldown_of(self.momentum_stall_cooldown_days, Duration::try_days)
            }
        }
    }
}

/// A cooldown that cannot be represented (negative or out of range) blocks.
fn cooldown_of(amount: i64, unit: fn(i64) -> Option<Duration>) -> Cooldown {
    if amount < 0 {
        return Cooldown::Forever;
    }
    unit(amount).map_or(Cooldown::Forever, Cooldown::For)
}

/// Outcome of the gate check; anything but `Allowed` names the first gate
/// that blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitDecision {
    Allowed,
    DailyCapReached,
    GlobalCooldown,
    CategoryCooldown,
    AlreadyDelivered,
}

impl RateLimitDecision {
    pub fn is_allowed(self) -> bool {
        self == RateLimitDecision::Allowed
    }
}

#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Run the gates for `event` at `now`.
    pub fn check<S: PreferenceStore>(
        &self,
        event: &NotificationEvent,
        now: DateTime<Utc>,
        prefs: &NotificationPreferences<S>,
    ) -> RateLimitDecision {
        if prefs.notifications_sent_today(now) >= self.config.daily_cap {
            return RateLimitDecision::DailyCapReached;
        }

        if let Some(last) = prefs.global_last_sent() {
            if self.config.global_cooldown().blocks(last, now) {
                return RateLimitDecision::GlobalCooldown;
            }
        }

        let category = event.category();
        if let Some(last) = prefs.last_sent(category) {
            if self.config.cooldown(category).blocks(last, now) {
                return RateLimitDecision::CategoryCooldown;
            }
        }

        let already_delivered = match event {
            NotificationEvent::CheckrideReady => prefs.checkride_ready_notified(),
            NotificationEvent::MilestoneCrossed {
                requirement_key, ..
            } => prefs.is_milestone_acknowledged(requirement_key),
            NotificationEvent::CurrencyCliff { .. } | NotificationEvent::MomentumStall { .. } => {
                false
            }
        };
        if already_delivered {
            return RateLimitDecision::AlreadyDelivered;
        }

        RateLimitDecision::Allowed
    }

    /// Whether `event` may be delivered at `now`.
    pub fn passes<S: PreferenceStore>(
        &self,
        event: &NotificationEvent,
        now: DateTime<Utc>,
        prefs: &NotificationPreferences<S>,
    ) -> bool {
        let decision = self.check(event, now, prefs);
        if !decision.is_allowed() {
            tracing::debug!(category = %event.category(), ?decision, "notification rate limited");
        }
        decision.is_allowed()
    }

    /// Record a delivery of `event` at `now`.
    ///
    /// Only call for events that passed the gates and were handed to the
    /// dispatcher.
    ///
    /// # Errors
    /// Returns an error if the preference store cannot be written.
    pub fn record<S: PreferenceStore>(
        &self,
        event: &NotificationEvent,
        now: DateTime<Utc>,
        prefs: &mut NotificationPreferences<S>,
    ) -> Result<()> {
        prefs.record_sent(event.category(), now)?;
        prefs.set_global_last_sent(now)?;
        prefs.increment_daily_count(now)?;

        match event {
            NotificationEvent::CheckrideReady => prefs.mark_checkride_ready_notified()?,
            NotificationEvent::MilestoneCrossed {
                requirement_key, ..
            } => prefs.acknowledge_milestone(requirement_key)?,
            NotificationEvent::CurrencyCliff { .. } | NotificationEvent::MomentumStall { .. } => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::CurrencyKind;
    use crate::notifications::preferences::MemoryStore;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 14, 0, 0).unwrap()
    }

    fn prefs() -> NotificationPreferences<MemoryStore> {
        NotificationPreferences::new(MemoryStore::new())
    }

    fn cliff() -> NotificationEvent {
        NotificationEvent::CurrencyCliff {
            kind: CurrencyKind::Day,
            days_remaining: 5,
        }
    }

    fn milestone(key: &str) -> NotificationEvent {
        NotificationEvent::MilestoneCrossed {
            requirement_title: "Solo Flight".into(),
            requirement_key: key.into(),
        }
    }

    #[test]
    fn fresh_state_passes() {
        let limiter = RateLimiter::new();
        assert_eq!(limiter.check(&cliff(), now(), &prefs()), RateLimitDecision::Allowed);
    }

    #[test]
    fn daily_cap_blocks_until_date_changes() {
        let limiter = RateLimiter::new();
        let mut p = prefs();
        let morning = Utc.with_ymd_and_hms(2025, 6, 15, 0, 30, 0).unwrap();
        p.increment_daily_count(morning).unwrap();
        p.increment_daily_count(morning).unwrap();

        let stall = NotificationEvent::MomentumStall {
            days_since_last_flight: 20,
            next_requirement_title: "Solo Flight".into(),
            remaining_hours: 5.0,
        };
        assert_eq!(limiter.check(&stall, now(), &p), RateLimitDecision::DailyCapReached);

        let tomorrow = Utc.with_ymd_and_hms(2025, 6, 16, 0, 5, 0).unwrap();
        assert!(limiter.passes(&stall, tomorrow, &p));
    }

    #[test]
    fn global_cooldown_blocks_any_category() {
        let limiter = RateLimiter::new();
        let mut p = prefs();
        p.set_global_last_sent(now() - Duration::hours(1)).unwrap();
        assert_eq!(limiter.check(&cliff(), now(), &p), RateLimitDecision::GlobalCooldown);

        p.set_global_last_sent(now() - Duration::hours(4)).unwrap();
        assert!(limiter.passes(&cliff(), now(), &p));
    }

    #[test]
    fn category_cooldown_for_currency_cliff() {
        let limiter = RateLimiter::new();
        let mut p = prefs();

        let eight_days_ago = now() - Duration::days(8);
        p.record_sent(NotificationCategory::CurrencyCliff, eight_days_ago).unwrap();
        p.set_global_last_sent(eight_days_ago).unwrap();
        assert!(limiter.passes(&cliff(), now(), &p));

        let three_days_ago = now() - Duration::days(3);
        p.record_sent(NotificationCategory::CurrencyCliff, three_days_ago).unwrap();
        p.set_global_last_sent(three_days_ago).unwrap();
        assert_eq!(limiter.check(&cliff(), now(), &p), RateLimitDecision::CategoryCooldown);
    }

    #[test]
    fn milestone_cooldown_is_a_day() {
        let limiter = RateLimiter::new();
        let mut p = prefs();
        p.record_sent(NotificationCategory::MilestoneCrossed, now() - Duration::hours(20))
            .unwrap();
        assert_eq!(
            limiter.check(&milestone("61.109(a)(3)"), now(), &p),
            RateLimitDecision::CategoryCooldown
        );
        p.record_sent(NotificationCategory::MilestoneCrossed, now() - Duration::hours(25))
            .unwrap();
        assert!(limiter.passes(&milestone("61.109(a)(3)"), now(), &p));
    }

    #[test]
    fn acknowledged_milestone_blocked_forever() {
        let limiter = RateLimiter::new();
        let mut p = prefs();
        p.acknowledge_milestone("61.109(a)(2)").unwrap();
        let much_later = now() + Duration::days(400);
        assert_eq!(
            limiter.check(&milestone("61.109(a)(2)"), much_later, &p),
            RateLimitDecision::AlreadyDelivered
        );
        assert!(limiter.passes(&milestone("61.109(a)(1)"), much_later, &p));
    }

    #[test]
    fn checkride_ready_blocked_once_flagged() {
        let limiter = RateLimiter::new();
        let mut p = prefs();
        p.mark_checkride_ready_notified().unwrap();
        assert_eq!(
            limiter.check(&NotificationEvent::CheckrideReady, now(), &p),
            RateLimitDecision::AlreadyDelivered
        );
    }

    #[test]
    fn record_updates_all_counters() {
        let limiter = RateLimiter::new();
        let mut p = prefs();
        limiter.record(&milestone("61.109(a)(2)"), now(), &mut p).unwrap();

        assert_eq!(p.last_sent(NotificationCategory::MilestoneCrossed), Some(now()));
        assert_eq!(p.global_last_sent(), Some(now()));
        assert_eq!(p.notifications_sent_today(now()), 1);
        assert!(p.is_milestone_acknowledged("61.109(a)(2)"));

        limiter
            .record(&NotificationEvent::CheckrideReady, now() + Duration::hours(5), &mut p)
            .unwrap();
        assert!(p.checkride_ready_notified());
        assert_eq!(p.notifications_sent_today(now()), 2);
        assert_eq!(
            limiter.check(&cliff(), now() + Duration::hours(9), &p),
            RateLimitDecision::DailyCapReached
        );
    }

    #[test]
    fn recorded_checkride_hits_forever_cooldown_first() {
        let limiter = RateLimiter::new();
        let mut p = prefs();
        p.record_sent(NotificationCategory::CheckrideReady, now() - Duration::days(365))
            .unwrap();
        assert_eq!(
            limiter.check(&NotificationEvent::CheckrideReady, now(), &p),
            RateLimitDecision::CategoryCooldown
        );
    }

    #[test]
    fn unrepresentable_cooldowns_block_instead_of_panicking() {
        let limiter = RateLimiter::with_config(RateLimitConfig {
            global_cooldown_hours: i64::MAX,
            currency_cliff_cooldown_days: -3,
            ..RateLimitConfig::default()
        });
        let mut p = prefs();
        p.set_global_last_sent(now() - Duration::days(3650)).unwrap();
        assert_eq!(
            limiter.check(&NotificationEvent::CheckrideReady, now(), &p),
            RateLimitDecision::GlobalCooldown
        );

        assert_eq!(limiter.config().cooldown(NotificationCategory::CurrencyCliff), Cooldown::Forever);
        assert_eq!(
            RateLimitConfig::default().cooldown(NotificationCategory::MilestoneCrossed),
            Cooldown::For(Duration::hours(24))
        );
    }

    #[test]
    fn custom_cap() {
        let limiter = RateLimiter::with_config(RateLimitConfig {
            daily_cap: 1,
            ..RateLimitConfig::default()
        });
        let mut p = prefs();
        p.increment_daily_count(now() - Duration::hours(6)).unwrap();
        assert!(!limiter.passes(&cliff(), now(), &p));
    }
}
