//! Level calculation from accumulated XP.
//!
//! A level is never stored on its own: it is always derived from the XP
//! total with [`level_of`]. Levels run from 1 to [`MAX_LEVEL`] in steps of
//! [`XP_PER_LEVEL`]; XP keeps accumulating past the cap.

use serde::{Deserialize, Serialize};

/// XP span of a single level.
pub const XP_PER_LEVEL: u64 = 1000;

/// Highest reachable level.
pub const MAX_LEVEL: u32 = 10;

/// Level for an XP total: `min(10, floor(xp / 1000) + 1)`.
pub fn level_of(xp: u64) -> u32 {
    let raw = xp / XP_PER_LEVEL + 1;
    raw.min(MAX_LEVEL as u64) as u32
}

/// Level for a signed XP value. Negative XP counts as zero.
pub fn level_of_signed(xp: i64) -> u32 {
    level_of(xp.max(0) as u64)
}

/// Minimum XP required to be at `level`, clamped to `[0, 9000]`.
pub fn xp_floor_of(level: u32) -> u64 {
    let level = level.clamp(1, MAX_LEVEL);
    (level as u64 - 1) * XP_PER_LEVEL
}

/// XP needed to reach the level after `level`, or `None` at the cap.
pub fn xp_ceiling_of(level: u32) -> Option<u64> {
    if level >= MAX_LEVEL {
        None
    } else {
        Some(level.max(1) as u64 * XP_PER_LEVEL)
    }
}

/// Percentage (0-100) of the way from the current level's floor to the next
/// level. Saturates at 100 once the cap is reached.
pub fn progress_within_level(xp: u64, level: u32) -> u8 {
    let Some(ceiling) = xp_ceiling_of(level) else {
        return 100;
    };
    let floor = xp_floor_of(level);
    if xp <= floor {
        return 0;
    }
    if xp >= ceiling {
        return 100;
    }
    ((xp - floor) * 100 / (ceiling - floor)) as u8
}

/// Snapshot of a user's position on the level curve, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    pub xp: u64,
    pub level: u32,
    pub level_floor: u64,
    pub next_level_at: Option<u64>,
    pub progress_percent: u8,
}

impl LevelSummary {
    pub fn for_xp(xp: u64) -> Self {
        let level = level_of(xp);
        Self {
            xp,
            level,
            level_floor: xp_floor_of(level),
            next_level_at: xp_ceiling_of(level),
            progress_percent: progress_within_level(xp, level),
        }
    }

    pub fn is_max_level(&self) -> bool {
        self.level >= MAX_LEVEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn level_boundaries() {
        assert_eq!(level_of(0), 1);
        assert_eq!(level_of(999), 1);
        assert_eq!(level_of(1000), 2);
        assert_eq!(level_of(1999), 2);
        assert_eq!(level_of(8999), 9);
        assert_eq!(level_of(9000), 10);
    }

    #[test]
    fn level_is_capped() {
        assert_eq!(level_of(50_000), 10);
        assert_eq!(level_of(u64::MAX), 10);
    }

    #[test]
    fn negative_xp_is_level_one() {
        assert_eq!(level_of_signed(-250), 1);
        assert_eq!(level_of_signed(2500), 3);
    }

    #[test]
    fn floor_and_ceiling() {
        assert_eq!(xp_floor_of(1), 0);
        assert_eq!(xp_floor_of(4), 3000);
        assert_eq!(xp_floor_of(10), 9000);
        assert_eq!(xp_floor_of(0), 0);
        assert_eq!(xp_floor_of(42), 9000);

        assert_eq!(xp_ceiling_of(1), Some(1000));
        assert_eq!(xp_ceiling_of(9), Some(9000));
        assert_eq!(xp_ceiling_of(10), None);
    }

    #[test]
    fn progress_inside_level() {
        assert_eq!(progress_within_level(0, 1), 0);
        assert_eq!(progress_within_level(500, 1), 50);
        assert_eq!(progress_within_level(1250, 2), 25);
        assert_eq!(progress_within_level(1999, 2), 99);
    }

    #[test]
    fn progress_saturates_at_cap() {
        assert_eq!(progress_within_level(9000, 10), 100);
        assert_eq!(progress_within_level(123_456, 10), 100);
    }

    #[test]
    fn progress_tolerates_stale_level() {
        // xp above the stated level's ceiling
        assert_eq!(progress_within_level(5000, 2), 100);
        // xp below the stated level's floor
        assert_eq!(progress_within_level(100, 3), 0);
    }

    #[test]
    fn summary_for_capped_user() {
        let summary = LevelSummary::for_xp(15_000);
        assert_eq!(summary.level, 10);
        assert_eq!(summary.level_floor, 9000);
        assert_eq!(summary.next_level_at, None);
        assert_eq!(summary.progress_percent, 100);
        assert!(summary.is_max_level());
    }

    proptest! {
        #[test]
        fn level_is_monotonic(a in 0u64..100_000, b in 0u64..100_000) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(level_of(lo) <= level_of(hi));
        }

        #[test]
        fn level_stays_in_range(xp in any::<u64>()) {
            let level = level_of(xp);
            prop_assert!((1..=MAX_LEVEL).contains(&level));
        }

        #[test]
        fn floor_of_level_is_reachable(xp in 0u64..20_000) {
            let level = level_of(xp);
            prop_assert!(xp_floor_of(level) <= xp);
            prop_assert_eq!(level_of(xp_floor_of(level)), level);
        }
    }
}
