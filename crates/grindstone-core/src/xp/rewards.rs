//! Named base-reward amounts per action type.
//!
//! The table lives in the `[rewards]` section of `config.toml`; every field
//! has a default so a partial section still loads.

use serde::{Deserialize, Serialize};

use crate::model::Priority;

/// Habit streak days that still earn the per-day streak bonus.
pub const HABIT_STREAK_BONUS_CAP_DAYS: u32 = 10;

/// Focus sessions at or above this length earn the standard amount.
pub const FOCUS_STANDARD_MIN: u32 = 25;

/// Focus sessions at or above this length earn the long amount.
pub const FOCUS_LONG_MIN: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTable {
    #[serde(default = "default_task_low")]
    pub task_low: u64,
    #[serde(default = "default_task_medium")]
    pub task_medium: u64,
    #[serde(default = "default_task_high")]
    pub task_high: u64,
    #[serde(default = "default_habit_completion")]
    pub habit_completion: u64,
    #[serde(default = "default_habit_streak_bonus_per_day")]
    pub habit_streak_bonus_per_day: u64,
    #[serde(default = "default_goal_milestone")]
    pub goal_milestone: u64,
    #[serde(default = "default_goal_completion")]
    pub goal_completion: u64,
    #[serde(default = "default_focus_short")]
    pub focus_short: u64,
    #[serde(default = "default_focus_standard")]
    pub focus_standard: u64,
    #[serde(default = "default_focus_long")]
    pub focus_long: u64,
    #[serde(default = "default_challenge_check_in")]
    pub challenge_check_in: u64,
    #[serde(default = "default_first_task_of_day")]
    pub first_task_of_day: u64,
    #[serde(default = "default_all_tasks_complete")]
    pub all_tasks_complete: u64,
}

fn default_task_low() -> u64 {
    10
}
fn default_task_medium() -> u64 {
    25
}
fn default_task_high() -> u64 {
    50
}
fn default_habit_completion() -> u64 {
    15
}
fn default_habit_streak_bonus_per_day() -> u64 {
    2
}
fn default_goal_milestone() -> u64 {
    50
}
fn default_goal_completion() -> u64 {
    200
}
fn default_focus_short() -> u64 {
    10
}
fn default_focus_standard() -> u64 {
    25
}
fn default_focus_long() -> u64 {
    50
}
fn default_challenge_check_in() -> u64 {
    10
}
fn default_first_task_of_day() -> u64 {
    10
}
fn default_all_tasks_complete() -> u64 {
    50
}

impl Default for RewardTable {
    fn default() -> Self {
        Self {
            task_low: default_task_low(),
            task_medium: default_task_medium(),
            task_high: default_task_high(),
            habit_completion: default_habit_completion(),
            habit_streak_bonus_per_day: default_habit_streak_bonus_per_day(),
            goal_milestone: default_goal_milestone(),
            goal_completion: default_goal_completion(),
            focus_short: default_focus_short(),
            focus_standard: default_focus_standard(),
            focus_long: default_focus_long(),
            challenge_check_in: default_challenge_check_in(),
            first_task_of_day: default_first_task_of_day(),
            all_tasks_complete: default_all_tasks_complete(),
        }
    }
}

impl RewardTable {
    /// Base reward for completing a task of the given priority.
    pub fn task(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Low => self.task_low,
            Priority::Medium => self.task_medium,
            Priority::High => self.task_high,
        }
    }

    /// Base reward for a habit completion at the habit's (already updated)
    /// streak. Streak days beyond the cap add nothing.
    pub fn habit(&self, habit_streak: u32) -> u64 {
        let bonus_days = habit_streak.min(HABIT_STREAK_BONUS_CAP_DAYS) as u64;
        self.habit_completion
            .saturating_add(self.habit_streak_bonus_per_day.saturating_mul(bonus_days))
    }

    /// Base reward for a focus session of `duration_min` minutes.
    /// Returns `None` for an empty session.
    pub fn focus(&self, duration_min: u32) -> Option<u64> {
        match duration_min {
            0 => None,
            d if d >= FOCUS_LONG_MIN => Some(self.focus_long),
            d if d >= FOCUS_STANDARD_MIN => Some(self.focus_standard),
            _ => Some(self.focus_short),
        }
    }

    /// Per-check-in reward fixed at challenge creation: one check-in unit
    /// per full week of requested duration, at least one.
    pub fn challenge(&self, duration_days: u32) -> u64 {
        self.challenge_check_in
            .saturating_mul((duration_days / 7).max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_rewards_rise_with_priority() {
        let table = RewardTable::default();
        assert!(table.task(Priority::Low) < table.task(Priority::Medium));
        assert!(table.task(Priority::Medium) < table.task(Priority::High));
    }

    #[test]
    fn habit_streak_bonus_is_capped() {
        let table = RewardTable::default();
        assert_eq!(table.habit(1), 15 + 2);
        assert_eq!(table.habit(10), 15 + 20);
        assert_eq!(table.habit(45), table.habit(10));
    }

    #[test]
    fn focus_tiers() {
        let table = RewardTable::default();
        assert_eq!(table.focus(0), None);
        assert_eq!(table.focus(10), Some(10));
        assert_eq!(table.focus(25), Some(25));
        assert_eq!(table.focus(49), Some(25));
        assert_eq!(table.focus(90), Some(50));
    }

    #[test]
    fn challenge_reward_scales_with_weeks() {
        let table = RewardTable::default();
        assert_eq!(table.challenge(3), 10);
        assert_eq!(table.challenge(7), 10);
        assert_eq!(table.challenge(21), 30);
        assert_eq!(table.challenge(30), 40);
    }

    #[test]
    fn huge_configured_amounts_saturate() {
        let table = RewardTable {
            habit_streak_bonus_per_day: u64::MAX,
            challenge_check_in: u64::MAX,
            ..RewardTable::default()
        };
        assert_eq!(table.habit(5), u64::MAX);
        assert_eq!(table.challenge(28), u64::MAX);
    }

    #[test]
    fn partial_toml_section_keeps_defaults() {
        let table: RewardTable = toml::from_str("task_high = 80").unwrap();
        assert_eq!(table.task_high, 80);
        assert_eq!(table.task_low, 10);
        assert_eq!(table.goal_completion, 200);
    }
}
