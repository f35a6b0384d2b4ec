//! Goal progress orchestrator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{load_user, non_empty};
use crate::error::{CoreError, Result};
use crate::model::{Goal, User};
use crate::storage::{Config, RecordStore};
use crate::xp::ledger::{self, signed_amount, LedgerOutcome, RewardReason};
use crate::xp::milestone::{self, MilestoneCrossing, COMPLETE, MILESTONE_STEP};
use crate::xp::streak::apply_bonus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalProgress {
    pub goal: Goal,
    pub user: User,
    pub crossing: MilestoneCrossing,
    /// One entry per bonus paid, in order.
    pub rewards: Vec<LedgerOutcome>,
}

impl GoalProgress {
    pub fn total_awarded(&self) -> i64 {
        self.rewards
            .iter()
            .fold(0i64, |total, o| total.saturating_add(o.delta))
    }
}

pub fn create_goal(
    store: &impl RecordStore,
    user_id: &str,
    title: &str,
    category: Option<&str>,
    deadline: Option<NaiveDate>,
) -> Result<Goal> {
    let user = load_user(store, user_id)?;
    let mut goal = Goal::new(&user.id, non_empty("title", title)?);
    goal.category = category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    goal.deadline = deadline;
    store.insert_goal(&goal)?;
    Ok(goal)
}

/// Progress the rewards are measured from: the stored progress, raised to
/// the highest boundary already paid for.
fn rewarded_floor(goal: &Goal) -> u8 {
    if goal.completion_rewarded {
        return COMPLETE;
    }
    goal.progress
        .min(COMPLETE)
        .max(goal.milestones_rewarded.saturating_mul(MILESTONE_STEP))
}

/// Set a goal's progress (clamped to 0-100) and pay for any boundary crossed
/// for the first time.
pub fn update_goal_progress<S: RecordStore>(
    store: &S,
    config: &Config,
    goal_id: &str,
    progress: i32,
    now: DateTime<Utc>,
) -> Result<GoalProgress> {
    let progress = progress.clamp(0, COMPLETE as i32) as u8;

    store.transaction(|store| {
        let mut goal = store
            .get_goal(goal_id)?
            .ok_or_else(|| CoreError::not_found("Goal", goal_id))?;
        let mut user = load_user(store, &goal.user_id)?;

        let crossing = milestone::detect(rewarded_floor(&goal), progress);
        let mut rewards = Vec::new();

        match crossing {
            MilestoneCrossing::Milestones { from, to } => {
                let amount = apply_bonus(config.rewards.goal_milestone, user.streak);
                for index in from + 1..=to {
                    tracing::debug!(goal = %goal.id, index, "goal milestone reached");
                    rewards.push(ledger::award(
                        store,
                        &mut user,
                        signed_amount(amount),
                        RewardReason::GoalMilestone(goal.id.clone()),
                    )?);
                }
                goal.milestones_rewarded = to;
            }
            MilestoneCrossing::Completion => {
                let amount = apply_bonus(config.rewards.goal_completion, user.streak);
                rewards.push(ledger::award(
                    store,
                    &mut user,
                    signed_amount(amount),
                    RewardReason::GoalCompleted(goal.id.clone()),
                )?);
                goal.completion_rewarded = true;
            }
            MilestoneCrossing::None => {}
        }

        goal.progress = progress;
        goal.completed_at = match (progress >= COMPLETE, goal.completed_at) {
            (true, Some(at)) => Some(at),
            (true, None) => Some(now),
            (false, _) => None,
        };
        store.update_goal(&goal)?;

        Ok(GoalProgress {
            goal,
            user,
            crossing,
            rewards,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{at, setup, with_streak};
    use crate::storage::Database;

    fn goal(db: &Database, user: &User) -> Goal {
        create_goal(db, &user.id, "Run a marathon", Some("health"), None).unwrap()
    }

    fn now() -> DateTime<Utc> {
        at("2026-05-04T09:00:00Z")
    }

    #[test]
    fn crossing_one_quartile_pays_one_milestone() {
        let (db, config, user) = setup();
        let g = goal(&db, &user);

        let result = update_goal_progress(&db, &config, &g.id, 30, now()).unwrap();
        assert_eq!(result.rewards.len(), 1);
        assert_eq!(result.total_awarded(), config.rewards.goal_milestone as i64);
        assert_eq!(result.goal.progress, 30);
        assert_eq!(result.goal.milestones_rewarded, 1);
    }

    #[test]
    fn jump_pays_each_crossed_quartile() {
        let (db, config, user) = setup();
        let g = goal(&db, &user);

        let result = update_goal_progress(&db, &config, &g.id, 80, now()).unwrap();
        assert_eq!(result.crossing, MilestoneCrossing::Milestones { from: 0, to: 3 });
        assert_eq!(result.rewards.len(), 3);
        assert_eq!(db.list_events(&user.id).unwrap().len(), 3);
    }

    #[test]
    fn reaching_complete_pays_completion_only() {
        let (db, config, user) = setup();
        let g = goal(&db, &user);

        let result = update_goal_progress(&db, &config, &g.id, 100, now()).unwrap();
        assert!(result.crossing.is_completion());
        assert_eq!(result.total_awarded(), config.rewards.goal_completion as i64);
        assert!(result.goal.completion_rewarded);
        assert_eq!(result.goal.completed_at, Some(now()));
    }

    #[test]
    fn milestone_bonus_uses_account_streak() {
        let (db, config, user) = setup();
        let user = with_streak(&db, &user, 100);
        let g = goal(&db, &user);

        let result = update_goal_progress(&db, &config, &g.id, 25, now()).unwrap();
        assert_eq!(result.total_awarded(), (config.rewards.goal_milestone * 15 / 10) as i64);
    }

    #[test]
    fn decrease_then_recross_pays_nothing() {
        let (db, config, user) = setup();
        let g = goal(&db, &user);

        update_goal_progress(&db, &config, &g.id, 55, now()).unwrap();
        let down = update_goal_progress(&db, &config, &g.id, 10, now()).unwrap();
        assert!(down.rewards.is_empty());
        assert_eq!(down.goal.progress, 10);

        let up = update_goal_progress(&db, &config, &g.id, 60, now()).unwrap();
        assert!(up.rewards.is_empty());

        let further = update_goal_progress(&db, &config, &g.id, 75, now()).unwrap();
        assert_eq!(further.rewards.len(), 1);
        assert_eq!(db.list_events(&user.id).unwrap().len(), 3);
    }

    #[test]
    fn completion_is_paid_once() {
        let (db, config, user) = setup();
        let g = goal(&db, &user);

        update_goal_progress(&db, &config, &g.id, 100, now()).unwrap();
        let reopened = update_goal_progress(&db, &config, &g.id, 90, now()).unwrap();
        assert!(reopened.goal.completed_at.is_none());

        let again = update_goal_progress(&db, &config, &g.id, 100, at("2026-05-05T09:00:00Z")).unwrap();
        assert!(again.rewards.is_empty());
        assert_eq!(again.goal.completed_at, Some(at("2026-05-05T09:00:00Z")));
    }

    #[test]
    fn progress_is_clamped() {
        let (db, config, user) = setup();
        let g = goal(&db, &user);

        let high = update_goal_progress(&db, &config, &g.id, 250, now()).unwrap();
        assert_eq!(high.goal.progress, 100);
        let low = update_goal_progress(&db, &config, &g.id, -20, now()).unwrap();
        assert_eq!(low.goal.progress, 0);
    }

    #[test]
    fn blank_category_is_dropped() {
        let (db, _, user) = setup();
        let g = create_goal(&db, &user.id, "Read", Some("  "), None).unwrap();
        assert!(g.category.is_none());
    }

    #[test]
    fn unknown_goal_is_not_found() {
        let (db, config, _) = setup();
        assert!(matches!(
            update_goal_progress(&db, &config, "goal-404", 50, now()),
            Err(CoreError::NotFound { kind: "Goal", .. })
        ));
    }
}
