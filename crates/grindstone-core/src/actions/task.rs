//! Task completion orchestrator.
//!
//! A task is either `pending` or `completed`. Completing pays the priority
//! base (streak-adjusted) and then checks the two once-per-day bonuses
//! against the freshly saved task state. Reopening takes XP back according
//! to [`RefundPolicy`]; daily bonuses already paid stay paid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{load_user, non_empty};
use crate::error::{CoreError, Result};
use crate::model::{Priority, Task, TaskStatus, User};
use crate::storage::{Config, RecordStore, RefundPolicy};
use crate::xp::ledger::{self, signed_amount, DailyBonus, LedgerOutcome, RewardReason};
use crate::xp::streak::apply_bonus;

/// Everything a completion changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub task: Task,
    pub user: User,
    pub reward: LedgerOutcome,
    pub first_task_of_day: Option<LedgerOutcome>,
    pub all_tasks_complete: Option<LedgerOutcome>,
}

impl TaskCompletion {
    /// XP granted by the completion and any daily bonuses.
    pub fn total_awarded(&self) -> i64 {
        [Some(self.reward), self.first_task_of_day, self.all_tasks_complete]
            .iter()
            .flatten()
            .fold(0i64, |total, o| total.saturating_add(o.delta))
    }

    pub fn leveled_up(&self) -> bool {
        [Some(self.reward), self.first_task_of_day, self.all_tasks_complete]
            .iter()
            .flatten()
            .any(|o| o.leveled_up)
    }
}

/// Everything a reopen (or deletion of a completed task) changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReopen {
    pub task: Task,
    pub user: User,
    pub deduction: LedgerOutcome,
}

fn load_task(store: &impl RecordStore, task_id: &str) -> Result<Task> {
    store
        .get_task(task_id)?
        .ok_or_else(|| CoreError::not_found("Task", task_id))
}

fn invalid_transition(task: &Task, to: TaskStatus) -> CoreError {
    CoreError::InvalidTransition {
        kind: "Task",
        id: task.id.clone(),
        from: task.status.to_string(),
        to: to.to_string(),
    }
}

/// Create a pending task for an existing user.
pub fn create_task(
    store: &impl RecordStore,
    user_id: &str,
    title: &str,
    priority: Priority,
) -> Result<Task> {
    let user = load_user(store, user_id)?;
    let task = Task::new(&user.id, non_empty("title", title)?, priority);
    store.insert_task(&task)?;
    Ok(task)
}

/// `pending -> completed`.
///
/// # Errors
/// `NotFound` for an unknown task or user, `InvalidTransition` if the task
/// is already completed, `Conflict` if the user changed concurrently.
pub fn complete_task<S: RecordStore>(
    store: &S,
    config: &Config,
    task_id: &str,
    now: DateTime<Utc>,
) -> Result<TaskCompletion> {
    store.transaction(|store| {
        let mut task = load_task(store, task_id)?;
        if !task.status.can_transition_to(TaskStatus::Completed) {
            return Err(invalid_transition(&task, TaskStatus::Completed));
        }
        let mut user = load_user(store, &task.user_id)?;

        let base = config.rewards.task(task.priority);
        let amount = apply_bonus(base, user.streak);

        user.total_tasks_completed = user.total_tasks_completed.saturating_add(1);
        let reward = ledger::award(
            store,
            &mut user,
            signed_amount(amount),
            RewardReason::TaskCompleted(task.id.clone()),
        )?;
        if reward.is_noop() {
            store.save_user(&mut user)?;
        }

        task.status = TaskStatus::Completed;
        task.xp_awarded = amount;
        task.completed_at = Some(now);
        store.update_task(&task)?;

        // Both checks read the store after the task row is updated.
        let day = config.clock.day_of(now);
        let (start, end) = config.clock.day_bounds(day);

        let completed_today = store.count_tasks_completed_between(&user.id, start, end)?;
        let first_task_of_day = if completed_today == 1 {
            grant_daily_bonus(
                store,
                &mut user,
                day,
                DailyBonus::FirstTaskOfDay,
                config.rewards.first_task_of_day,
            )?
        } else {
            None
        };

        let pending = store.count_pending_tasks(&user.id)?;
        let all_tasks_complete = if pending == 0 {
            grant_daily_bonus(
                store,
                &mut user,
                day,
                DailyBonus::AllTasksComplete,
                config.rewards.all_tasks_complete,
            )?
        } else {
            None
        };

        Ok(TaskCompletion {
            task,
            user,
            reward,
            first_task_of_day,
            all_tasks_complete,
        })
    })
}

fn grant_daily_bonus(
    store: &impl RecordStore,
    user: &mut User,
    day: chrono::NaiveDate,
    kind: DailyBonus,
    amount: u64,
) -> Result<Option<LedgerOutcome>> {
    if !store.claim_daily_bonus(&user.id, day, kind)? {
        tracing::debug!(user = %user.id, %day, bonus = kind.as_str(), "daily bonus already granted");
        return Ok(None);
    }
    ledger::award(store, user, signed_amount(amount), kind.reason(day)).map(Some)
}

fn refund_amount(config: &Config, task: &Task) -> u64 {
    match config.ledger.refund_policy {
        RefundPolicy::Base => config.rewards.task(task.priority),
        RefundPolicy::Exact => task.xp_awarded,
    }
}

fn reverse_completion<S: RecordStore>(
    store: &S,
    config: &Config,
    task: &mut Task,
    reason: RewardReason,
) -> Result<(User, LedgerOutcome)> {
    let mut user = load_user(store, &task.user_id)?;

    user.total_tasks_completed = user.total_tasks_completed.saturating_sub(1);
    let refund = refund_amount(config, task);
    let deduction = ledger::deduct(store, &mut user, signed_amount(refund), reason)?;
    if deduction.is_noop() {
        store.save_user(&mut user)?;
    }

    task.status = TaskStatus::Pending;
    task.xp_deducted = deduction.delta.unsigned_abs();
    task.completed_at = None;
    Ok((user, deduction))
}

/// `completed -> pending`.
///
/// # Errors
/// `NotFound` for an unknown task or user, `InvalidTransition` if the task
/// is still pending.
pub fn reopen_task<S: RecordStore>(store: &S, config: &Config, task_id: &str) -> Result<TaskReopen> {
    store.transaction(|store| {
        let mut task = load_task(store, task_id)?;
        if !task.status.can_transition_to(TaskStatus::Pending) {
            return Err(invalid_transition(&task, TaskStatus::Pending));
        }

        let reason = RewardReason::TaskReopened(task.id.clone());
        let (user, deduction) = reverse_completion(store, config, &mut task, reason)?;
        store.update_task(&task)?;

        Ok(TaskReopen {
            task,
            user,
            deduction,
        })
    })
}

/// Delete a task. A completed task has its award reversed first, exactly as
/// [`reopen_task`] would; the returned value describes that reversal.
pub fn delete_task<S: RecordStore>(
    store: &S,
    config: &Config,
    task_id: &str,
) -> Result<Option<TaskReopen>> {
    store.transaction(|store| {
        let mut task = load_task(store, task_id)?;
        let reversal = if task.is_completed() {
            let reason = RewardReason::TaskDeleted(task.id.clone());
            let (user, deduction) = reverse_completion(store, config, &mut task, reason)?;
            Some(TaskReopen {
                task: task.clone(),
                user,
                deduction,
            })
        } else {
            None
        };

        store.delete_task(&task.id)?;
        tracing::info!(task = %task.id, reversed = reversal.is_some(), "task deleted");
        Ok(reversal)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{at, setup, with_streak};
    use crate::storage::Database;

    fn task(db: &Database, user: &User, priority: Priority) -> Task {
        create_task(db, &user.id, "task", priority).unwrap()
    }

    #[test]
    fn completion_pays_priority_base_with_streak_bonus() {
        let (db, config, user) = setup();
        let user = with_streak(&db, &user, 10);
        let high = task(&db, &user, Priority::High);
        task(&db, &user, Priority::Low);

        let result = complete_task(&db, &config, &high.id, at("2026-05-04T09:00:00Z")).unwrap();

        let expected = config.rewards.task_high * 12 / 10;
        assert_eq!(result.reward.delta, expected as i64);
        assert_eq!(result.task.xp_awarded, expected);
        assert_eq!(result.task.status, TaskStatus::Completed);
        assert_eq!(result.user.total_tasks_completed, 1);
        assert_eq!(
            result.first_task_of_day.unwrap().delta,
            config.rewards.first_task_of_day as i64
        );
        assert!(result.all_tasks_complete.is_none());
    }

    #[test]
    fn first_task_bonus_only_once_per_day() {
        let (db, config, user) = setup();
        let a = task(&db, &user, Priority::Medium);
        let b = task(&db, &user, Priority::Medium);
        task(&db, &user, Priority::Medium);

        let first = complete_task(&db, &config, &a.id, at("2026-05-04T09:00:00Z")).unwrap();
        let second = complete_task(&db, &config, &b.id, at("2026-05-04T10:00:00Z")).unwrap();

        assert!(first.first_task_of_day.is_some());
        assert!(second.first_task_of_day.is_none());

        let bonuses = db
            .list_events(&user.id)
            .unwrap()
            .into_iter()
            .filter(|e| matches!(e.reason, RewardReason::FirstTaskOfDay(_)))
            .count();
        assert_eq!(bonuses, 1);
    }

    #[test]
    fn first_task_bonus_returns_the_next_day() {
        let (db, config, user) = setup();
        let a = task(&db, &user, Priority::Low);
        let b = task(&db, &user, Priority::Low);
        task(&db, &user, Priority::Low);

        complete_task(&db, &config, &a.id, at("2026-05-04T09:00:00Z")).unwrap();
        let next_day = complete_task(&db, &config, &b.id, at("2026-05-05T09:00:00Z")).unwrap();
        assert!(next_day.first_task_of_day.is_some());
    }

    #[test]
    fn first_task_bonus_needs_no_earlier_completion_in_the_window() {
        let (db, mut config, user) = setup();
        let a = task(&db, &user, Priority::Low);
        let b = task(&db, &user, Priority::Low);
        task(&db, &user, Priority::Low);

        complete_task(&db, &config, &a.id, at("2026-05-04T20:00:00Z")).unwrap();

        // at +05:00 the local day of 22:00Z starts at 19:00Z, so `a` already
        // falls inside it even though that day's flag is still unclaimed
        config.clock.utc_offset_hours = 5;
        let later = complete_task(&db, &config, &b.id, at("2026-05-04T22:00:00Z")).unwrap();
        assert!(later.first_task_of_day.is_none());
        let bonuses = db
            .list_events(&user.id)
            .unwrap()
            .into_iter()
            .filter(|e| matches!(e.reason, RewardReason::FirstTaskOfDay(_)))
            .count();
        assert_eq!(bonuses, 1);
    }

    #[test]
    fn reopen_and_recomplete_does_not_repeat_first_task_bonus() {
        let (db, config, user) = setup();
        let a = task(&db, &user, Priority::Low);
        task(&db, &user, Priority::Low);
        let now = at("2026-05-04T09:00:00Z");

        complete_task(&db, &config, &a.id, now).unwrap();
        reopen_task(&db, &config, &a.id).unwrap();
        let again = complete_task(&db, &config, &a.id, now).unwrap();
        assert!(again.first_task_of_day.is_none());
    }

    #[test]
    fn finishing_the_last_pending_task_pays_all_complete_once() {
        let (db, config, user) = setup();
        let a = task(&db, &user, Priority::Low);
        let b = task(&db, &user, Priority::Low);
        let now = at("2026-05-04T09:00:00Z");

        let first = complete_task(&db, &config, &a.id, now).unwrap();
        assert!(first.all_tasks_complete.is_none());

        let last = complete_task(&db, &config, &b.id, now).unwrap();
        assert_eq!(
            last.all_tasks_complete.unwrap().delta,
            config.rewards.all_tasks_complete as i64
        );

        reopen_task(&db, &config, &b.id).unwrap();
        let again = complete_task(&db, &config, &b.id, now).unwrap();
        assert!(again.all_tasks_complete.is_none());
    }

    #[test]
    fn completing_twice_is_rejected() {
        let (db, config, user) = setup();
        let a = task(&db, &user, Priority::Low);
        let now = at("2026-05-04T09:00:00Z");
        complete_task(&db, &config, &a.id, now).unwrap();

        let err = complete_task(&db, &config, &a.id, now).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(db.get_user(&user.id).unwrap().unwrap().total_tasks_completed, 1);
    }

    #[test]
    fn reopening_pending_task_is_rejected() {
        let (db, config, user) = setup();
        let a = task(&db, &user, Priority::Low);
        assert!(matches!(
            reopen_task(&db, &config, &a.id),
            Err(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn reopen_deducts_base_not_bonus_by_default() {
        let (db, config, user) = setup();
        let user = with_streak(&db, &user, 30);
        let a = task(&db, &user, Priority::High);
        task(&db, &user, Priority::High);

        let done = complete_task(&db, &config, &a.id, at("2026-05-04T09:00:00Z")).unwrap();
        let xp_after_completion = done.user.xp;

        let reopened = reopen_task(&db, &config, &a.id).unwrap();
        assert_eq!(reopened.deduction.delta, -(config.rewards.task_high as i64));
        assert_eq!(reopened.task.xp_deducted, config.rewards.task_high);
        assert_eq!(reopened.task.status, TaskStatus::Pending);
        assert!(reopened.task.completed_at.is_none());
        assert_eq!(reopened.user.total_tasks_completed, 0);
        assert_eq!(reopened.user.xp, xp_after_completion - config.rewards.task_high);
    }

    #[test]
    fn exact_refund_policy_deducts_what_was_awarded() {
        let (db, mut config, user) = setup();
        config.ledger.refund_policy = RefundPolicy::Exact;
        let user = with_streak(&db, &user, 30);
        let a = task(&db, &user, Priority::High);
        task(&db, &user, Priority::High);

        let done = complete_task(&db, &config, &a.id, at("2026-05-04T09:00:00Z")).unwrap();
        let reopened = reopen_task(&db, &config, &a.id).unwrap();
        assert_eq!(reopened.deduction.delta, -done.reward.delta);
    }

    #[test]
    fn reopen_never_goes_below_zero() {
        let (db, mut config, user) = setup();
        config.rewards.first_task_of_day = 0;
        let a = task(&db, &user, Priority::High);
        task(&db, &user, Priority::Low);
        complete_task(&db, &config, &a.id, at("2026-05-04T09:00:00Z")).unwrap();

        // spend the XP through a manual deduction
        let mut current = db.get_user(&user.id).unwrap().unwrap();
        ledger::deduct(&db, &mut current, 45, RewardReason::Manual("spent".into())).unwrap();

        let reopened = reopen_task(&db, &config, &a.id).unwrap();
        assert_eq!(reopened.user.xp, 0);
        assert_eq!(reopened.deduction.delta, -5);
    }

    #[test]
    fn delete_completed_task_reverses_award() {
        let (db, config, user) = setup();
        let a = task(&db, &user, Priority::Medium);
        task(&db, &user, Priority::Medium);
        complete_task(&db, &config, &a.id, at("2026-05-04T09:00:00Z")).unwrap();

        let reversal = delete_task(&db, &config, &a.id).unwrap().unwrap();
        assert_eq!(reversal.deduction.delta, -(config.rewards.task_medium as i64));
        assert!(db.get_task(&a.id).unwrap().is_none());
    }

    #[test]
    fn delete_pending_task_changes_no_xp() {
        let (db, config, user) = setup();
        let a = task(&db, &user, Priority::Medium);
        assert!(delete_task(&db, &config, &a.id).unwrap().is_none());
        assert!(db.list_events(&user.id).unwrap().is_empty());
    }

    #[test]
    fn zero_reward_still_counts_completion() {
        let (db, mut config, user) = setup();
        config.rewards.task_low = 0;
        config.rewards.first_task_of_day = 0;
        let a = task(&db, &user, Priority::Low);
        task(&db, &user, Priority::Low);

        let result = complete_task(&db, &config, &a.id, at("2026-05-04T09:00:00Z")).unwrap();
        assert!(result.reward.is_noop());
        assert_eq!(db.get_user(&user.id).unwrap().unwrap().total_tasks_completed, 1);
    }

    #[test]
    fn level_up_is_reported() {
        let (db, mut config, user) = setup();
        config.rewards.task_high = 1200;
        let a = task(&db, &user, Priority::High);
        task(&db, &user, Priority::High);

        let result = complete_task(&db, &config, &a.id, at("2026-05-04T09:00:00Z")).unwrap();
        assert!(result.leveled_up());
        assert_eq!(result.user.level, 2);
        assert_eq!(
            result.total_awarded(),
            1200 + config.rewards.first_task_of_day as i64
        );
    }
}
