pub mod config;
pub mod database;
pub mod migrations;

pub use config::{ClockConfig, Config, LedgerConfig, RefundPolicy};
pub use database::Database;

use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

use crate::error::Result;
use crate::model::{Challenge, FocusSession, Goal, Habit, Task, User};
use crate::xp::ledger::{DailyBonus, RewardEvent};

/// Returns the data directory.
///
/// `GRINDSTONE_DATA_DIR` wins if set. Otherwise `~/.config/grindstone[-dev]/`
/// based on `GRINDSTONE_ENV` (set it to `dev` for a development directory).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("GRINDSTONE_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("GRINDSTONE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("grindstone-dev")
            } else {
                base_dir.join("grindstone")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Persistence seen by the reward engine.
///
/// Lookups return `Ok(None)` for missing records; orchestrators turn that
/// into [`crate::CoreError::NotFound`]. `save_user` is a compare-and-swap on
/// [`User::version`].
pub trait RecordStore {
    /// Run `f` atomically. Joins the enclosing transaction if one is open.
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>;

    // users
    fn insert_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn list_users(&self) -> Result<Vec<User>>;
    /// Persist `user` if its version still matches the stored one, then bump
    /// the in-memory version. Fails with `CoreError::Conflict` otherwise.
    fn save_user(&self, user: &mut User) -> Result<()>;

    // tasks
    fn insert_task(&self, task: &Task) -> Result<()>;
    fn get_task(&self, id: &str) -> Result<Option<Task>>;
    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>>;
    fn update_task(&self, task: &Task) -> Result<()>;
    fn delete_task(&self, id: &str) -> Result<()>;
    fn count_tasks_completed_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32>;
    fn count_pending_tasks(&self, user_id: &str) -> Result<u32>;

    // goals
    fn insert_goal(&self, goal: &Goal) -> Result<()>;
    fn get_goal(&self, id: &str) -> Result<Option<Goal>>;
    fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>>;
    fn update_goal(&self, goal: &Goal) -> Result<()>;

    // habits
    fn insert_habit(&self, habit: &Habit) -> Result<()>;
    fn get_habit(&self, id: &str) -> Result<Option<Habit>>;
    fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>>;
    fn update_habit(&self, habit: &Habit) -> Result<()>;
    /// Record a completion for `day`. Returns `false` if one already exists.
    fn record_habit_completion(&self, habit_id: &str, day: NaiveDate) -> Result<bool>;

    // focus sessions
    fn insert_focus_session(&self, session: &FocusSession) -> Result<()>;
    fn list_focus_sessions(&self, user_id: &str) -> Result<Vec<FocusSession>>;

    // challenges
    fn insert_challenge(&self, challenge: &Challenge) -> Result<()>;
    fn get_challenge(&self, id: &str) -> Result<Option<Challenge>>;
    fn list_challenges(&self, user_id: &str) -> Result<Vec<Challenge>>;
    fn update_challenge(&self, challenge: &Challenge) -> Result<()>;
    /// Record a check-in for `day`. Returns `false` if one already exists.
    fn record_challenge_check_in(&self, challenge_id: &str, day: NaiveDate) -> Result<bool>;

    // reward log
    fn append_event(&self, event: &RewardEvent) -> Result<i64>;
    fn list_events(&self, user_id: &str) -> Result<Vec<RewardEvent>>;
    fn sum_event_deltas(&self, user_id: &str) -> Result<i64>;

    /// Claim a once-per-day bonus. Returns `true` only for the first claim.
    fn claim_daily_bonus(&self, user_id: &str, day: NaiveDate, kind: DailyBonus) -> Result<bool>;
}
