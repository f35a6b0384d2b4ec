//! The reward ledger: the only code that assigns `User::xp` and `User::level`.
//!
//! Every applied change is persisted on the user aggregate and appended to
//! the `reward_events` log with the delta that was actually applied, so the
//! log folds back to the stored XP total.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::User;
use crate::storage::RecordStore;
use crate::xp::level::level_of;

/// Highest XP total a user can hold; the store keeps XP as a signed 64-bit
/// integer.
pub const MAX_XP: u64 = i64::MAX as u64;

/// Convert an unsigned reward amount into a ledger amount, saturating at
/// `i64::MAX` instead of wrapping negative.
pub fn signed_amount(amount: u64) -> i64 {
    i64::try_from(amount).unwrap_or(i64::MAX)
}

/// Why XP moved. The payload identifies the record (or day) involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "source", rename_all = "snake_case")]
pub enum RewardReason {
    TaskCompleted(String),
    TaskReopened(String),
    TaskDeleted(String),
    FirstTaskOfDay(NaiveDate),
    AllTasksComplete(NaiveDate),
    HabitCompleted(String),
    GoalMilestone(String),
    GoalCompleted(String),
    FocusSession(String),
    ChallengeCheckIn(String),
    Manual(String),
}

impl RewardReason {
    pub fn kind(&self) -> &'static str {
        match self {
            RewardReason::TaskCompleted(_) => "task_completed",
            RewardReason::TaskReopened(_) => "task_reopened",
            RewardReason::TaskDeleted(_) => "task_deleted",
            RewardReason::FirstTaskOfDay(_) => "first_task_of_day",
            RewardReason::AllTasksComplete(_) => "all_tasks_complete",
            RewardReason::HabitCompleted(_) => "habit_completed",
            RewardReason::GoalMilestone(_) => "goal_milestone",
            RewardReason::GoalCompleted(_) => "goal_completed",
            RewardReason::FocusSession(_) => "focus_session",
            RewardReason::ChallengeCheckIn(_) => "challenge_check_in",
            RewardReason::Manual(_) => "manual",
        }
    }

    pub fn source(&self) -> String {
        match self {
            RewardReason::FirstTaskOfDay(day) | RewardReason::AllTasksComplete(day) => {
                day.format("%Y-%m-%d").to_string()
            }
            RewardReason::TaskCompleted(s)
            | RewardReason::TaskReopened(s)
            | RewardReason::TaskDeleted(s)
            | RewardReason::HabitCompleted(s)
            | RewardReason::GoalMilestone(s)
            | RewardReason::GoalCompleted(s)
            | RewardReason::FocusSession(s)
            | RewardReason::ChallengeCheckIn(s)
            | RewardReason::Manual(s) => s.clone(),
        }
    }

    /// Rebuild a reason from its stored `kind` and `source` columns.
    pub fn from_parts(kind: &str, source: &str) -> Option<Self> {
        let day = || NaiveDate::parse_from_str(source, "%Y-%m-%d").ok();
        let s = source.to_string();
        Some(match kind {
            "task_completed" => RewardReason::TaskCompleted(s),
            "task_reopened" => RewardReason::TaskReopened(s),
            "task_deleted" => RewardReason::TaskDeleted(s),
            "first_task_of_day" => RewardReason::FirstTaskOfDay(day()?),
            "all_tasks_complete" => RewardReason::AllTasksComplete(day()?),
            "habit_completed" => RewardReason::HabitCompleted(s),
            "goal_milestone" => RewardReason::GoalMilestone(s),
            "goal_completed" => RewardReason::GoalCompleted(s),
            "focus_session" => RewardReason::FocusSession(s),
            "challenge_check_in" => RewardReason::ChallengeCheckIn(s),
            "manual" => RewardReason::Manual(s),
            _ => return None,
        })
    }
}

/// One entry of the append-only reward log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEvent {
    /// Assigned by the store; 0 before insertion.
    pub id: i64,
    pub user_id: String,
    /// Signed XP change actually applied.
    pub delta: i64,
    pub reason: RewardReason,
    pub created_at: DateTime<Utc>,
}

/// Bonuses granted at most once per user per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DailyBonus {
    FirstTaskOfDay,
    AllTasksComplete,
}

impl DailyBonus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DailyBonus::FirstTaskOfDay => "first_task_of_day",
            DailyBonus::AllTasksComplete => "all_tasks_complete",
        }
    }

    pub fn reason(&self, day: NaiveDate) -> RewardReason {
        match self {
            DailyBonus::FirstTaskOfDay => RewardReason::FirstTaskOfDay(day),
            DailyBonus::AllTasksComplete => RewardReason::AllTasksComplete(day),
        }
    }
}

/// Result of an [`award`] or [`deduct`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerOutcome {
    /// Signed XP change applied; 0 for a no-op.
    pub delta: i64,
    pub old_level: u32,
    pub new_level: u32,
    pub leveled_up: bool,
    pub leveled_down: bool,
    /// XP total after the change.
    pub xp: u64,
}

impl LedgerOutcome {
    fn unchanged(user: &User) -> Self {
        let level = level_of(user.xp);
        Self {
            delta: 0,
            old_level: level,
            new_level: level,
            leveled_up: false,
            leveled_down: false,
            xp: user.xp,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.delta == 0
    }
}

/// Result of [`recalculate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recalculation {
    pub changed: bool,
    pub old_level: u32,
    pub new_level: u32,
}

/// Result of [`rebuild_from_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rebuild {
    pub old_xp: u64,
    pub new_xp: u64,
    pub level: Recalculation,
}

fn apply(
    store: &impl RecordStore,
    user: &mut User,
    new_xp: u64,
    reason: RewardReason,
) -> Result<LedgerOutcome> {
    let old_xp = user.xp;
    let old_level = level_of(old_xp);

    user.xp = new_xp;
    user.level = level_of(new_xp);
    store.save_user(user)?;

    let delta = new_xp as i64 - old_xp as i64;
    store.append_event(&RewardEvent {
        id: 0,
        user_id: user.id.clone(),
        delta,
        reason,
        created_at: Utc::now(),
    })?;

    Ok(LedgerOutcome {
        delta,
        old_level,
        new_level: user.level,
        leveled_up: user.level > old_level,
        leveled_down: user.level < old_level,
        xp: user.xp,
    })
}

/// Add `amount` XP to `user` and persist. Non-positive amounts are a no-op.
///
/// # Errors
/// Propagates store failures. On failure the in-memory `user` keeps the new
/// values even though they were not saved.
pub fn award(
    store: &impl RecordStore,
    user: &mut User,
    amount: i64,
    reason: RewardReason,
) -> Result<LedgerOutcome> {
    if amount <= 0 {
        tracing::debug!(user = %user.id, amount, reason = reason.kind(), "award skipped");
        return Ok(LedgerOutcome::unchanged(user));
    }

    let new_xp = user.xp.saturating_add(amount as u64).min(MAX_XP);
    if new_xp == user.xp {
        tracing::debug!(user = %user.id, amount, reason = reason.kind(), "xp already at cap");
        return Ok(LedgerOutcome::unchanged(user));
    }
    let outcome = apply(store, user, new_xp, reason.clone())?;
    tracing::info!(
        user = %user.id,
        delta = outcome.delta,
        xp = outcome.xp,
        reason = reason.kind(),
        "xp awarded"
    );
    if outcome.leveled_up {
        tracing::info!(user = %user.id, from = outcome.old_level, to = outcome.new_level, "level up");
    }
    Ok(outcome)
}

/// Remove up to `amount` XP from `user` and persist. XP never drops below 0.
/// Non-positive amounts, and deductions from a user with no XP, are no-ops.
///
/// # Errors
/// Propagates store failures, like [`award`].
pub fn deduct(
    store: &impl RecordStore,
    user: &mut User,
    amount: i64,
    reason: RewardReason,
) -> Result<LedgerOutcome> {
    if amount <= 0 || user.xp == 0 {
        tracing::debug!(user = %user.id, amount, reason = reason.kind(), "deduct skipped");
        return Ok(LedgerOutcome::unchanged(user));
    }

    let new_xp = user.xp.saturating_sub(amount as u64);
    let outcome = apply(store, user, new_xp, reason.clone())?;
    tracing::info!(
        user = %user.id,
        delta = outcome.delta,
        xp = outcome.xp,
        reason = reason.kind(),
        "xp deducted"
    );
    if outcome.leveled_down {
        tracing::info!(user = %user.id, from = outcome.old_level, to = outcome.new_level, "level down");
    }
    Ok(outcome)
}

/// Reset `user.level` to the level derived from `user.xp`. Writes only when
/// the stored level had drifted.
pub fn recalculate(store: &impl RecordStore, user: &mut User) -> Result<Recalculation> {
    let old_level = user.level;
    let new_level = level_of(user.xp);
    let changed = old_level != new_level;

    if changed {
        user.level = new_level;
        store.save_user(user)?;
        tracing::warn!(user = %user.id, old_level, new_level, "level drift repaired");
    }

    Ok(Recalculation {
        changed,
        old_level,
        new_level,
    })
}

/// XP total implied by a sequence of applied deltas.
pub fn xp_from_events<'a>(events: impl IntoIterator<Item = &'a RewardEvent>) -> u64 {
    events
        .into_iter()
        .fold(0i64, |total, event| total.saturating_add(event.delta).max(0)) as u64
}

/// Reset `user.xp` to the sum of the reward log, then recalculate the level.
pub fn rebuild_from_events(store: &impl RecordStore, user: &mut User) -> Result<Rebuild> {
    let old_xp = user.xp;
    let new_xp = store.sum_event_deltas(&user.id)?.max(0) as u64;

    if new_xp != old_xp {
        tracing::warn!(user = %user.id, old_xp, new_xp, "xp drift repaired from reward log");
        let old_level = user.level;
        user.xp = new_xp;
        user.level = level_of(new_xp);
        store.save_user(user)?;
        return Ok(Rebuild {
            old_xp,
            new_xp,
            level: Recalculation {
                changed: old_level != user.level,
                old_level,
                new_level: user.level,
            },
        });
    }

    Ok(Rebuild {
        old_xp,
        new_xp,
        level: recalculate(store, user)?,
    })
}
