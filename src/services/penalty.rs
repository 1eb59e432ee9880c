//! Reliability penalties for dropping work and surge pay for unclaimed work.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

pub const NO_SHOW_PENALTY: i32 = -20;
pub const LATE_PENALTY: i32 = -10;
pub const MID_PENALTY: i32 = -6;
pub const EARLY_PENALTY: i32 = -3;
pub const EXCLUSION_WINDOW_PENALTY: i32 = -2;
pub const ADVANCE_NOTICE_PENALTY: i32 = -1;

/// Reason tags recorded with score adjustments.
pub mod reason {
    pub const NO_SHOW: &str = "NOSHOW";
    pub const UNACCEPT: &str = "UNACCEPT";
    pub const UNACCEPT_LATE_CANCEL: &str = "UNACCEPT_LATE_CANCEL";
    pub const CANCEL_IN_PROGRESS_REVERT: &str = "CANCEL_IN_PROGRESS_REVERT";
    pub const CANCEL_IN_PROGRESS_LATE: &str = "CANCEL_IN_PROGRESS_LATE";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyTier {
    NoShow,
    Late,
    Mid,
    Early,
    ExclusionWindow,
    AdvanceNotice,
    None,
}

impl PenaltyTier {
    pub fn delta(self) -> i32 {
        match self {
            PenaltyTier::NoShow => NO_SHOW_PENALTY,
            PenaltyTier::Late => LATE_PENALTY,
            PenaltyTier::Mid => MID_PENALTY,
            PenaltyTier::Early => EARLY_PENALTY,
            PenaltyTier::ExclusionWindow => EXCLUSION_WINDOW_PENALTY,
            PenaltyTier::AdvanceNotice => ADVANCE_NOTICE_PENALTY,
            PenaltyTier::None => 0,
        }
    }

    /// Whether the worker loses access to the instance.
    pub fn excludes(self) -> bool {
        !matches!(self, PenaltyTier::AdvanceNotice | PenaltyTier::None)
    }
}

/// Penalty for giving a job back, by how close it is to the no-show time.
pub fn unassign_penalty(
    now: DateTime<Utc>,
    earliest_start: Option<DateTime<Utc>>,
    no_show: Option<DateTime<Utc>>,
) -> PenaltyTier {
    let Some(no_show) = no_show else {
        return PenaltyTier::Late;
    };
    if now >= no_show {
        return PenaltyTier::Late;
    }

    let to_no_show = no_show - now;
    if to_no_show < Duration::minutes(90) {
        return PenaltyTier::Late;
    }
    if to_no_show < Duration::hours(3) {
        return PenaltyTier::Mid;
    }
    if to_no_show < Duration::hours(6) {
        return PenaltyTier::Early;
    }
    if to_no_show < Duration::hours(7) {
        return PenaltyTier::ExclusionWindow;
    }

    if let Some(earliest) = earliest_start {
        let to_start = earliest - now;
        if to_start > Duration::zero() && to_start < Duration::hours(24) {
            return PenaltyTier::AdvanceNotice;
        }
    }
    PenaltyTier::None
}

/// Most urgent first.
const SURGE_STAGES: [(i64, f64); 4] = [(45, 1.50), (90, 1.35), (180, 1.20), (360, 1.10)];

/// Pay multiplier for an unclaimed job, if any stage applies.
pub fn surge_multiplier(now: DateTime<Utc>, no_show: DateTime<Utc>) -> Option<f64> {
    if now >= no_show {
        return None;
    }
    let time_left = no_show - now;
    SURGE_STAGES
        .iter()
        .find(|(minutes, _)| time_left < Duration::minutes(*minutes))
        .map(|(_, multiplier)| *multiplier)
}

/// New effective pay, only when the surge actually raises it.
pub fn surged_pay(base_pay: f64, multiplier: f64, current_pay: f64) -> Option<f64> {
    let pay = round_cents(base_pay * multiplier);
    (pay > current_pay).then_some(pay)
}

pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn no_show() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 20, 40, 0).unwrap()
    }

    fn before(d: Duration) -> DateTime<Utc> {
        no_show() - d
    }

    #[test]
    fn test_tiers_by_time_to_no_show() {
        let earliest = Some(no_show() - Duration::hours(2));
        let ns = Some(no_show());
        assert_eq!(unassign_penalty(before(Duration::zero()), earliest, ns), PenaltyTier::Late);
        assert_eq!(unassign_penalty(before(Duration::minutes(89)), earliest, ns), PenaltyTier::Late);
        assert_eq!(unassign_penalty(before(Duration::minutes(90)), earliest, ns), PenaltyTier::Mid);
        assert_eq!(unassign_penalty(before(Duration::hours(2)), earliest, ns), PenaltyTier::Mid);
        assert_eq!(unassign_penalty(before(Duration::hours(4)), earliest, ns), PenaltyTier::Early);
        assert_eq!(
            unassign_penalty(before(Duration::minutes(390)), earliest, ns),
            PenaltyTier::ExclusionWindow
        );
    }

    #[test]
    fn test_advance_notice_and_none() {
        let ns = Some(no_show());
        let earliest = Some(no_show() - Duration::hours(2));
        // 8h before no-show, 6h before earliest start
        assert_eq!(
            unassign_penalty(before(Duration::hours(8)), earliest, ns),
            PenaltyTier::AdvanceNotice
        );
        // 30h before earliest start
        let now = earliest.unwrap() - Duration::hours(30);
        let tier = unassign_penalty(now, earliest, ns);
        assert_eq!(tier, PenaltyTier::None);
        assert_eq!(tier.delta(), 0);
        assert!(!tier.excludes());
    }

    #[test]
    fn test_missing_no_show_is_late() {
        let tier = unassign_penalty(Utc::now(), None, None);
        assert_eq!(tier, PenaltyTier::Late);
        assert!(tier.excludes());
    }

    #[test]
    fn test_severity_ordering() {
        let tiers = [
            PenaltyTier::NoShow,
            PenaltyTier::Late,
            PenaltyTier::Mid,
            PenaltyTier::Early,
            PenaltyTier::ExclusionWindow,
            PenaltyTier::AdvanceNotice,
            PenaltyTier::None,
        ];
        for pair in tiers.windows(2) {
            assert!(pair[0].delta() < pair[1].delta());
        }
    }

    #[test]
    fn test_surge_stages() {
        assert_eq!(surge_multiplier(before(Duration::minutes(30)), no_show()), Some(1.50));
        assert_eq!(surge_multiplier(before(Duration::minutes(45)), no_show()), Some(1.35));
        assert_eq!(surge_multiplier(before(Duration::minutes(120)), no_show()), Some(1.20));
        assert_eq!(surge_multiplier(before(Duration::minutes(300)), no_show()), Some(1.10));
        assert_eq!(surge_multiplier(before(Duration::hours(6)), no_show()), None);
        assert_eq!(surge_multiplier(no_show(), no_show()), None);
    }

    #[test]
    fn test_surge_only_raises() {
        assert_eq!(surged_pay(40.0, 1.10, 40.0), Some(44.0));
        assert_eq!(surged_pay(40.0, 1.10, 44.0), None);
        assert_eq!(surged_pay(40.0, 1.20, 60.0), None);
        assert_eq!(surged_pay(33.0, 1.35, 33.0), Some(44.55));
    }
}
