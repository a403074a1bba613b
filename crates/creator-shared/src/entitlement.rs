use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::TRIAL_DURATION_DAYS;

/// Resolved access level of the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "daysRemaining", rename_all = "camelCase")]
pub enum EntitlementState {
    /// No check has resolved yet.
    Loading,
    TrialActive(u32),
    TrialExpired,
    Subscribed,
}

impl EntitlementState {
    /// Whether the full app may be used.
    pub fn has_access(self) -> bool {
        matches!(self, Self::TrialActive(_) | Self::Subscribed)
    }

    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Loading)
    }

    pub fn trial_days_remaining(self) -> Option<u32> {
        match self {
            Self::TrialActive(days) => Some(days),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntitlementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::TrialActive(days) => write!(f, "trial ({days} days left)"),
            Self::TrialExpired => write!(f, "trial expired"),
            Self::Subscribed => write!(f, "subscribed"),
        }
    }
}

/// Trial state for a trial that started at `trial_start`.
///
/// Elapsed time is floored to whole days. The result is purely local-clock
/// based, so a start in the future (clock moved back) leaves more than the
/// full trial.
pub fn resolve_trial(trial_start: DateTime<Utc>, now: DateTime<Utc>) -> EntitlementState {
    let elapsed_days = (now - trial_start)
        .num_milliseconds()
        .div_euclid(Duration::days(1).num_milliseconds());
    let remaining = TRIAL_DURATION_DAYS.saturating_sub(elapsed_days);

    if remaining > 0 {
        EntitlementState::TrialActive(u32::try_from(remaining).unwrap_or(u32::MAX))
    } else {
        EntitlementState::TrialExpired
    }
}

/// Parse a persisted trial start; `None` unless it is an RFC 3339 timestamp.
pub fn parse_trial_start(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_fresh_trial_has_full_duration() {
        assert_eq!(resolve_trial(now(), now()), EntitlementState::TrialActive(14));
    }

    #[test]
    fn test_five_days_in() {
        let start = now() - Duration::days(5);
        assert_eq!(resolve_trial(start, now()), EntitlementState::TrialActive(9));
    }

    #[test]
    fn test_partial_days_are_floored() {
        let start = now() - Duration::days(5) - Duration::hours(23);
        assert_eq!(resolve_trial(start, now()), EntitlementState::TrialActive(9));
    }

    #[test]
    fn test_last_day_and_expiry() {
        let start = now() - Duration::days(13);
        assert_eq!(resolve_trial(start, now()), EntitlementState::TrialActive(1));

        let start = now() - Duration::days(14);
        assert_eq!(resolve_trial(start, now()), EntitlementState::TrialExpired);

        let start = now() - Duration::days(400);
        assert_eq!(resolve_trial(start, now()), EntitlementState::TrialExpired);
    }

    #[test]
    fn test_future_start_extends_the_trial() {
        let start = now() + Duration::days(3);
        assert_eq!(resolve_trial(start, now()), EntitlementState::TrialActive(17));

        // Partial negative days floor away from zero.
        let start = now() + Duration::hours(1);
        assert_eq!(resolve_trial(start, now()), EntitlementState::TrialActive(15));
    }

    #[test]
    fn test_parse_trial_start() {
        let parsed = parse_trial_start("2025-06-10T08:00:00.000Z").unwrap();
        assert_eq!(parsed, now() - Duration::days(5));
        assert!(parse_trial_start("yesterday").is_none());
    }

    #[test]
    fn test_access() {
        assert!(EntitlementState::Subscribed.has_access());
        assert!(EntitlementState::TrialActive(3).has_access());
        assert!(!EntitlementState::TrialExpired.has_access());
        assert!(!EntitlementState::Loading.has_access());
        assert!(!EntitlementState::Loading.is_resolved());
    }
}
