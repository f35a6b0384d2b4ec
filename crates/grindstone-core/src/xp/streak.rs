//! Account-streak bonus multiplier and streak upkeep.
//!
//! The multiplier is a non-decreasing step function of the user's
//! account-level streak (consecutive active days). It never drops below 1.0,
//! so a bonus-adjusted reward is never smaller than its base.

use chrono::NaiveDate;

/// Streak tiers as `(minimum streak days, multiplier in tenths)`, highest first.
const TIERS: [(u32, u64); 3] = [(100, 15), (30, 13), (7, 12)];

fn multiplier_tenths(streak_days: u32) -> u64 {
    TIERS
        .iter()
        .find(|(min_days, _)| streak_days >= *min_days)
        .map(|(_, tenths)| *tenths)
        .unwrap_or(10)
}

/// Bonus factor for a streak: 1.5 from 100 days, 1.3 from 30, 1.2 from 7,
/// otherwise 1.0.
pub fn multiplier_for(streak_days: u32) -> f64 {
    multiplier_tenths(streak_days) as f64 / 10.0
}

/// `floor(base * multiplier_for(streak_days))`, computed without floating point
/// and saturating at `u64::MAX`.
pub fn apply_bonus(base: u64, streak_days: u32) -> u64 {
    let scaled = u128::from(base) * u128::from(multiplier_tenths(streak_days)) / 10;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Streak value after activity on `today`.
///
/// Activity on the same day keeps the streak (at least 1), activity the day
/// after the last active day extends it, anything else starts over at 1.
pub fn next_streak(last_active_on: Option<NaiveDate>, today: NaiveDate, current: u32) -> u32 {
    match last_active_on {
        None => 1,
        Some(last) => match (today - last).num_days() {
            0 => current.max(1),
            1 => current.saturating_add(1),
            // clock went backwards; leave the streak alone
            d if d < 0 => current.max(1),
            _ => 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn multiplier_tiers() {
        assert_eq!(multiplier_for(0), 1.0);
        assert_eq!(multiplier_for(6), 1.0);
        assert_eq!(multiplier_for(7), 1.2);
        assert_eq!(multiplier_for(29), 1.2);
        assert_eq!(multiplier_for(30), 1.3);
        assert_eq!(multiplier_for(99), 1.3);
        assert_eq!(multiplier_for(100), 1.5);
        assert_eq!(multiplier_for(365), 1.5);
    }

    #[test]
    fn bonus_examples() {
        assert_eq!(apply_bonus(100, 6), 100);
        assert_eq!(apply_bonus(100, 7), 120);
        assert_eq!(apply_bonus(100, 29), 120);
        assert_eq!(apply_bonus(100, 30), 130);
        assert_eq!(apply_bonus(100, 100), 150);
    }

    #[test]
    fn bonus_floors_fractions() {
        // 15 * 1.3 = 19.5
        assert_eq!(apply_bonus(15, 30), 19);
        // 25 * 1.2 = 30.0 exactly; float math would give 29.999...
        assert_eq!(apply_bonus(25, 7), 30);
        assert_eq!(apply_bonus(0, 100), 0);
    }

    #[test]
    fn bonus_saturates_on_huge_bases() {
        assert_eq!(apply_bonus(u64::MAX, 0), u64::MAX);
        assert_eq!(apply_bonus(u64::MAX, 100), u64::MAX);
        assert_eq!(apply_bonus(u64::MAX / 2, 100), u64::MAX);
    }

    #[test]
    fn streak_first_activity() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(next_streak(None, today, 0), 1);
    }

    #[test]
    fn streak_same_day_is_unchanged() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(next_streak(Some(today), today, 4), 4);
        assert_eq!(next_streak(Some(today), today, 0), 1);
    }

    #[test]
    fn streak_continues_from_yesterday() {
        let yesterday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(next_streak(Some(yesterday), today, 6), 7);
    }

    #[test]
    fn streak_resets_after_gap() {
        let last = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        assert_eq!(next_streak(Some(last), today, 40), 1);
    }

    proptest! {
        #[test]
        fn bonus_never_below_base(base in 0u64..1_000_000, streak in any::<u32>()) {
            prop_assert!(apply_bonus(base, streak) >= base);
        }

        #[test]
        fn multiplier_is_non_decreasing(a in 0u32..500, b in 0u32..500) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(multiplier_for(lo) <= multiplier_for(hi));
        }
    }
}
