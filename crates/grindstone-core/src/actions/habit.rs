//! Habit completion orchestrator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{load_user, non_empty};
use crate::error::{CoreError, Result, ValidationError};
use crate::model::{Habit, User};
use crate::storage::{Config, RecordStore};
use crate::xp::ledger::{self, signed_amount, LedgerOutcome, RewardReason};
use crate::xp::streak::{apply_bonus, next_streak};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitCompletion {
    pub habit: Habit,
    pub user: User,
    pub reward: LedgerOutcome,
}

pub fn create_habit(
    store: &impl RecordStore,
    user_id: &str,
    name: &str,
    now: DateTime<Utc>,
) -> Result<Habit> {
    let user = load_user(store, user_id)?;
    let mut habit = Habit::new(&user.id, non_empty("name", name)?);
    habit.created_at = now;
    store.insert_habit(&habit)?;
    Ok(habit)
}

/// Completions count from the day the habit was created up to today.
fn check_day(config: &Config, habit: &Habit, day: NaiveDate, now: DateTime<Utc>) -> Result<()> {
    let invalid = |message: String| {
        Err(ValidationError::InvalidValue {
            field: "day".into(),
            message,
        }
        .into())
    };
    let today = config.clock.day_of(now);
    if day > today {
        return invalid(format!("{day} is after today ({today})"));
    }
    let created_on = config.clock.day_of(habit.created_at);
    if day < created_on {
        return invalid(format!("{day} is before the habit was created ({created_on})"));
    }
    Ok(())
}

/// Record the habit as done on `day` and pay for it.
///
/// # Errors
/// `Validation` if `day` is in the future or before the habit existed,
/// `AlreadyRecorded` if the habit was already completed on `day`.
pub fn complete_habit<S: RecordStore>(
    store: &S,
    config: &Config,
    habit_id: &str,
    day: NaiveDate,
    now: DateTime<Utc>,
) -> Result<HabitCompletion> {
    store.transaction(|store| {
        let mut habit = store
            .get_habit(habit_id)?
            .ok_or_else(|| CoreError::not_found("Habit", habit_id))?;
        check_day(config, &habit, day, now)?;

        if !store.record_habit_completion(&habit.id, day)? {
            return Err(CoreError::AlreadyRecorded {
                kind: "Habit",
                id: habit.id,
                day,
            });
        }

        habit.streak = next_streak(habit.last_completed_on, day, habit.streak);
        habit.longest_streak = habit.longest_streak.max(habit.streak);
        habit.total_completions = habit.total_completions.saturating_add(1);
        if habit.last_completed_on.map_or(true, |last| day > last) {
            habit.last_completed_on = Some(day);
        }
        store.update_habit(&habit)?;

        let mut user = load_user(store, &habit.user_id)?;
        let amount = apply_bonus(config.rewards.habit(habit.streak), user.streak);
        let reward = ledger::award(
            store,
            &mut user,
            signed_amount(amount),
            RewardReason::HabitCompleted(habit.id.clone()),
        )?;

        Ok(HabitCompletion {
            habit,
            user,
            reward,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{at, setup, with_streak};
    use crate::storage::Database;
    use crate::xp::ledger::MAX_XP;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    fn now() -> DateTime<Utc> {
        at("2026-05-31T18:00:00Z")
    }

    fn habit(db: &Database, user: &User) -> Habit {
        create_habit(db, &user.id, "Stretch", at("2026-05-01T06:00:00Z")).unwrap()
    }

    #[test]
    fn first_completion_starts_streak() {
        let (db, config, user) = setup();
        let h = habit(&db, &user);

        let result = complete_habit(&db, &config, &h.id, day(4), now()).unwrap();
        assert_eq!(result.habit.streak, 1);
        assert_eq!(result.habit.longest_streak, 1);
        assert_eq!(result.habit.total_completions, 1);
        assert_eq!(result.habit.last_completed_on, Some(day(4)));
        assert_eq!(
            result.reward.delta,
            (config.rewards.habit_completion + config.rewards.habit_streak_bonus_per_day) as i64
        );
    }

    #[test]
    fn second_completion_same_day_is_rejected() {
        let (db, config, user) = setup();
        let h = habit(&db, &user);
        complete_habit(&db, &config, &h.id, day(4), now()).unwrap();

        let err = complete_habit(&db, &config, &h.id, day(4), now()).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyRecorded { kind: "Habit", .. }));
        assert_eq!(db.list_events(&user.id).unwrap().len(), 1);
        assert_eq!(db.get_habit(&h.id).unwrap().unwrap().total_completions, 1);
    }

    #[test]
    fn future_day_is_rejected() {
        let (db, config, user) = setup();
        let h = habit(&db, &user);

        let tomorrow = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let err = complete_habit(&db, &config, &h.id, tomorrow, now()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));

        let stored = db.get_habit(&h.id).unwrap().unwrap();
        assert!(stored.last_completed_on.is_none());
        assert!(db.list_events(&user.id).unwrap().is_empty());

        // the rejected day left nothing behind that blocks real completions
        complete_habit(&db, &config, &h.id, day(30), now()).unwrap();
        let next = complete_habit(&db, &config, &h.id, day(31), now()).unwrap();
        assert_eq!(next.habit.streak, 2);
    }

    #[test]
    fn day_before_creation_is_rejected() {
        let (db, config, user) = setup();
        let h = habit(&db, &user);

        for backdated in [NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(), day(1).pred_opt().unwrap()] {
            let err = complete_habit(&db, &config, &h.id, backdated, now()).unwrap_err();
            assert!(matches!(err, CoreError::Validation(_)), "{backdated}");
        }
        assert!(db.list_events(&user.id).unwrap().is_empty());

        // the creation day itself counts
        complete_habit(&db, &config, &h.id, day(1), now()).unwrap();
    }

    #[test]
    fn consecutive_days_extend_and_gaps_reset() {
        let (db, config, user) = setup();
        let h = habit(&db, &user);
        for d in 1..=3 {
            complete_habit(&db, &config, &h.id, day(d), now()).unwrap();
        }
        let after_gap = complete_habit(&db, &config, &h.id, day(6), now()).unwrap();

        assert_eq!(after_gap.habit.streak, 1);
        assert_eq!(after_gap.habit.longest_streak, 3);
        assert_eq!(after_gap.habit.total_completions, 4);
    }

    #[test]
    fn habit_streak_bonus_stops_at_cap() {
        let (db, config, user) = setup();
        let h = habit(&db, &user);
        let mut last = None;
        for d in 1..=12 {
            last = Some(complete_habit(&db, &config, &h.id, day(d), now()).unwrap());
        }
        let last = last.unwrap();
        assert_eq!(last.habit.streak, 12);
        assert_eq!(
            last.reward.delta,
            (config.rewards.habit_completion + 10 * config.rewards.habit_streak_bonus_per_day) as i64
        );
    }

    #[test]
    fn account_streak_multiplies_habit_reward() {
        let (db, config, user) = setup();
        let user = with_streak(&db, &user, 7);
        let h = habit(&db, &user);

        let result = complete_habit(&db, &config, &h.id, day(4), now()).unwrap();
        let base = config.rewards.habit(1);
        assert_eq!(result.reward.delta, (base * 12 / 10) as i64);
    }

    #[test]
    fn huge_streak_bonus_saturates_instead_of_overflowing() {
        let (db, mut config, user) = setup();
        config.rewards.habit_streak_bonus_per_day = u64::MAX;
        let h = habit(&db, &user);

        let result = complete_habit(&db, &config, &h.id, day(4), now()).unwrap();
        assert_eq!(result.reward.delta, i64::MAX);
        assert_eq!(result.user.xp, MAX_XP);
        assert_eq!(result.user.level, 10);

        // at the ceiling further completions record nothing
        let capped = complete_habit(&db, &config, &h.id, day(5), now()).unwrap();
        assert!(capped.reward.is_noop());
        assert_eq!(capped.user.xp, MAX_XP);
        assert_eq!(db.list_events(&user.id).unwrap().len(), 1);
    }
}
