//! Action orchestrators.
//!
//! Each orchestrator reacts to one kind of user action: it computes a base
//! reward from the action's own rules, scales it with the account streak via
//! [`crate::xp::apply_bonus`], and hands the result to the ledger. Every
//! orchestrator call runs inside a single store transaction.

pub mod activity;
pub mod challenge;
pub mod focus;
pub mod goal;
pub mod habit;
pub mod task;

use crate::error::{CoreError, Result};
use crate::model::User;
use crate::storage::RecordStore;

pub use activity::{record_activity, ActivityUpdate};
pub use challenge::{check_in, create_challenge, ChallengeCheckIn};
pub use focus::{complete_focus_session, FocusCompletion};
pub use goal::{create_goal, update_goal_progress, GoalProgress};
pub use habit::{complete_habit, create_habit, HabitCompletion};
pub use task::{complete_task, create_task, delete_task, reopen_task, TaskCompletion, TaskReopen};

/// Load a user or fail with `NotFound`.
pub fn load_user(store: &impl RecordStore, user_id: &str) -> Result<User> {
    store
        .get_user(user_id)?
        .ok_or_else(|| CoreError::not_found("User", user_id))
}

/// Create and persist a new user at level 1 with no XP.
pub fn create_user(store: &impl RecordStore, name: &str) -> Result<User> {
    let user = User::new(non_empty("name", name)?);
    store.insert_user(&user)?;
    tracing::info!(user = %user.id, "user created");
    Ok(user)
}

fn non_empty(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(crate::error::ValidationError::InvalidValue {
            field: field.into(),
            message: "must not be empty".into(),
        }
        .into());
    }
    Ok(trimmed.to_string())
}
