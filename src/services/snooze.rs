// Cooldown ("snooze") gating for alerts whose condition is met. Pure
// decisions over fields already on the alert.

use crate::models::{Alert, SnoozeCondition};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozeDecision {
    Fire,
    AlreadyFired,
    Cooldown { remaining_secs: i64 },
    OutsideWindow,
    UnknownPolicy,
}

impl SnoozeDecision {
    pub fn is_fire(self) -> bool {
        matches!(self, SnoozeDecision::Fire)
    }
}

pub fn has_capacity(alert: &Alert) -> bool {
    alert.max_repeat_count <= 0 || alert.repeat_count < alert.max_repeat_count
}

/// Decides whether a met alert may fire at `now` (unix seconds).
///
/// Cooldown policies key off `updatedAt`, which the engine only advances on
/// a fire; an alert that never fired has nothing to cool down from.
/// Timestamps too far out to compare against `now` deny.
pub fn decide(alert: &Alert, now: i64, tolerance_secs: i64) -> SnoozeDecision {
    match alert.snooze_condition {
        SnoozeCondition::OnlyOnce => {
            if alert.repeat_count == 0 {
                SnoozeDecision::Fire
            } else {
                SnoozeDecision::AlreadyFired
            }
        }
        SnoozeCondition::OnceADay
        | SnoozeCondition::OncePer10Seconds
        | SnoozeCondition::OncePer5Minutes => {
            let cooldown = alert.snooze_condition.cooldown_secs().unwrap_or(0);
            let Some(last) = alert.last_fired_at() else {
                return SnoozeDecision::Fire;
            };
            match now.checked_sub(last) {
                Some(elapsed) if elapsed >= cooldown => SnoozeDecision::Fire,
                Some(elapsed) => SnoozeDecision::Cooldown {
                    remaining_secs: cooldown.saturating_sub(elapsed),
                },
                // last fire is unrepresentably far from now
                None => SnoozeDecision::Cooldown {
                    remaining_secs: cooldown,
                },
            }
        }
        SnoozeCondition::AtSpecificTime => {
            let distance = alert
                .next_trigger_time
                .and_then(|at| now.checked_sub(at))
                .map(i64::unsigned_abs);
            match distance {
                Some(d) if d <= tolerance_secs.max(0).unsigned_abs() => SnoozeDecision::Fire,
                _ => SnoozeDecision::OutsideWindow,
            }
        }
        SnoozeCondition::Forever => SnoozeDecision::Fire,
        SnoozeCondition::Unknown => SnoozeDecision::UnknownPolicy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AlertClass;

    const T0: i64 = 1_700_000_000;

    fn fired_alert(policy: SnoozeCondition, last_fire: i64) -> Alert {
        let mut a = Alert::new("u1", "BTCUSDT", AlertClass::Spot, policy, T0 - 3_600);
        a.repeat_count = 1;
        a.updated_at = last_fire;
        a
    }

    #[test]
    fn only_once_fires_only_before_first_fire() {
        let fresh = Alert::new("u1", "BTCUSDT", AlertClass::Spot, SnoozeCondition::OnlyOnce, T0);
        assert_eq!(decide(&fresh, T0, 30), SnoozeDecision::Fire);

        let fired = fired_alert(SnoozeCondition::OnlyOnce, T0);
        assert_eq!(decide(&fired, T0 + 1_000_000, 30), SnoozeDecision::AlreadyFired);
    }

    #[test]
    fn ten_second_cooldown() {
        let a = fired_alert(SnoozeCondition::OncePer10Seconds, T0);
        assert_eq!(
            decide(&a, T0 + 5, 30),
            SnoozeDecision::Cooldown { remaining_secs: 5 }
        );
        assert!(decide(&a, T0 + 10, 30).is_fire());
        assert!(decide(&a, T0 + 11, 30).is_fire());
    }

    #[test]
    fn five_minute_and_daily_cooldowns() {
        let five = fired_alert(SnoozeCondition::OncePer5Minutes, T0);
        assert!(!decide(&five, T0 + 299, 30).is_fire());
        assert!(decide(&five, T0 + 300, 30).is_fire());

        let daily = fired_alert(SnoozeCondition::OnceADay, T0);
        assert!(!decide(&daily, T0 + 86_399, 30).is_fire());
        assert!(decide(&daily, T0 + 86_400, 30).is_fire());
    }

    #[test]
    fn never_fired_cooldown_alert_may_fire_right_after_creation() {
        let a = Alert::new("u1", "BTCUSDT", AlertClass::Spot, SnoozeCondition::OncePer10Seconds, T0);
        assert!(decide(&a, T0 + 1, 30).is_fire());
    }

    #[test]
    fn specific_time_uses_tolerance_window() {
        let mut a = Alert::new("u1", "BTCUSDT", AlertClass::Spot, SnoozeCondition::AtSpecificTime, T0);
        assert_eq!(decide(&a, T0, 30), SnoozeDecision::OutsideWindow);

        a.next_trigger_time = Some(T0 + 600);
        assert!(!decide(&a, T0 + 569, 30).is_fire());
        assert!(decide(&a, T0 + 570, 30).is_fire());
        assert!(decide(&a, T0 + 630, 30).is_fire());
        assert!(!decide(&a, T0 + 631, 30).is_fire());
        assert!(decide(&a, T0 + 600, 0).is_fire());
    }

    #[test]
    fn forever_always_fires_and_unknown_never_does() {
        let f = fired_alert(SnoozeCondition::Forever, T0);
        assert!(decide(&f, T0, 30).is_fire());

        let u = fired_alert(SnoozeCondition::Unknown, T0 - 1_000_000);
        assert_eq!(decide(&u, T0, 30), SnoozeDecision::UnknownPolicy);
    }

    #[test]
    fn extreme_timestamps_deny_instead_of_overflowing() {
        let mut at = Alert::new("u1", "BTCUSDT", AlertClass::Spot, SnoozeCondition::AtSpecificTime, T0);
        at.next_trigger_time = Some(i64::MIN);
        assert_eq!(decide(&at, T0, 30), SnoozeDecision::OutsideWindow);
        at.next_trigger_time = Some(i64::MAX);
        assert_eq!(decide(&at, T0, 30), SnoozeDecision::OutsideWindow);
        assert_eq!(decide(&at, i64::MAX, i64::MAX), SnoozeDecision::Fire);

        let past = fired_alert(SnoozeCondition::OncePer10Seconds, i64::MIN);
        assert_eq!(
            decide(&past, T0, 30),
            SnoozeDecision::Cooldown { remaining_secs: 10 }
        );

        let future = fired_alert(SnoozeCondition::OncePer10Seconds, i64::MAX);
        assert!(!decide(&future, T0, 30).is_fire());
    }

    #[test]
    fn capacity_pre_check() {
        let mut a = Alert::new("u1", "BTCUSDT", AlertClass::Spot, SnoozeCondition::Forever, T0);
        assert!(has_capacity(&a));
        a.repeat_count = 1_000;
        assert!(has_capacity(&a));

        a = a.with_max_repeat_count(3);
        a.repeat_count = 2;
        assert!(has_capacity(&a));
        a.repeat_count = 3;
        assert!(!has_capacity(&a));
    }
}
