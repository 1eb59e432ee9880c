//! Learn per-weekday time estimates from completed runs.

use crate::models::definition::DailyPayEstimate;
use crate::services::penalty::round_cents;

pub const EMA_ALPHA: f64 = 0.20;
const CLIP_LOW: f64 = 0.4;
const CLIP_HIGH: f64 = 1.6;

/// Blend one observed duration into the estimate and rescale pay.
///
/// The sample is clipped to [40%, 160%] of the current estimate first. Pay
/// follows the estimate relative to the initial anchors, never compounding.
pub fn apply_completion_sample(estimate: &mut DailyPayEstimate, actual_minutes: i64) {
    let current = f64::from(estimate.estimated_time_minutes.max(1));
    let low = (current * CLIP_LOW).max(1.0);
    let high = current * CLIP_HIGH;
    let sample = (actual_minutes as f64).clamp(low, high);

    let blended = current + EMA_ALPHA * (sample - current);
    let new_minutes = (blended.round() as i32).max(1);
    estimate.estimated_time_minutes = new_minutes;

    let anchor_minutes = f64::from(estimate.initial_estimated_time_minutes.max(1));
    estimate.base_pay =
        round_cents(f64::from(new_minutes) / anchor_minutes * estimate.initial_base_pay);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    #[test]
    fn test_three_cycle_progression() {
        let mut est = DailyPayEstimate::new(Weekday::Tue, 60.0, 60);

        apply_completion_sample(&mut est, 30);
        assert_eq!(est.estimated_time_minutes, 54);
        assert_eq!(est.base_pay, 54.0);

        apply_completion_sample(&mut est, 70);
        assert_eq!(est.estimated_time_minutes, 57);

        apply_completion_sample(&mut est, 55);
        assert_eq!(est.estimated_time_minutes, 57);
        assert_eq!(est.base_pay, 57.0);

        assert_eq!(est.initial_estimated_time_minutes, 60);
        assert_eq!(est.initial_base_pay, 60.0);
    }

    #[test]
    fn test_outliers_are_clipped() {
        let mut est = DailyPayEstimate::new(Weekday::Mon, 30.0, 100);
        // 1000 clips to 160: 100 + 0.2 * 60 = 112
        apply_completion_sample(&mut est, 1000);
        assert_eq!(est.estimated_time_minutes, 112);

        let mut est = DailyPayEstimate::new(Weekday::Mon, 30.0, 100);
        // 1 clips to 40: 100 - 0.2 * 60 = 88
        apply_completion_sample(&mut est, 1);
        assert_eq!(est.estimated_time_minutes, 88);
        assert_eq!(est.base_pay, 26.4);
    }

    #[test]
    fn test_floor_of_one_minute() {
        let mut est = DailyPayEstimate::new(Weekday::Mon, 5.0, 1);
        apply_completion_sample(&mut est, 0);
        assert_eq!(est.estimated_time_minutes, 1);
        assert_eq!(est.base_pay, 5.0);
    }
}
