//! Challenge orchestrator: a fixed-length run of daily check-ins.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{load_user, non_empty};
use crate::error::{CoreError, Result, ValidationError};
use crate::model::{Challenge, User};
use crate::storage::{Config, RecordStore};
use crate::xp::ledger::{self, signed_amount, LedgerOutcome, RewardReason};
use crate::xp::streak::apply_bonus;

/// Longest challenge that can be created, in days.
pub const MAX_DURATION_DAYS: u32 = 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeCheckIn {
    pub challenge: Challenge,
    pub user: User,
    pub reward: LedgerOutcome,
    /// True when this check-in finished the challenge.
    pub just_completed: bool,
}

/// Create a challenge starting on `started_on`. The per-check-in reward is
/// fixed here from the current reward table.
pub fn create_challenge(
    store: &impl RecordStore,
    config: &Config,
    user_id: &str,
    title: &str,
    duration_days: u32,
    started_on: NaiveDate,
) -> Result<Challenge> {
    if !(1..=MAX_DURATION_DAYS).contains(&duration_days) {
        return Err(ValidationError::OutOfRange {
            field: "duration_days".into(),
            value: duration_days as i64,
            min: 1,
            max: MAX_DURATION_DAYS as i64,
        }
        .into());
    }
    let user = load_user(store, user_id)?;

    let challenge = Challenge::new(
        &user.id,
        non_empty("title", title)?,
        duration_days,
        config.rewards.challenge(duration_days),
        started_on,
    );
    store.insert_challenge(&challenge)?;
    Ok(challenge)
}

/// Check in on `day`.
///
/// # Errors
/// `InvalidTransition` once the challenge is completed, `Validation` for a
/// day outside `[started_on, started_on + duration_days)`, `AlreadyRecorded`
/// for a second check-in on the same day.
pub fn check_in<S: RecordStore>(
    store: &S,
    challenge_id: &str,
    day: NaiveDate,
) -> Result<ChallengeCheckIn> {
    store.transaction(|store| {
        let mut challenge = store
            .get_challenge(challenge_id)?
            .ok_or_else(|| CoreError::not_found("Challenge", challenge_id))?;

        if challenge.completed {
            return Err(CoreError::InvalidTransition {
                kind: "Challenge",
                id: challenge.id,
                from: "completed".into(),
                to: "checked_in".into(),
            });
        }
        let offset = (day - challenge.started_on).num_days();
        let last = i64::from(challenge.duration_days) - 1;
        if !(0..=last).contains(&offset) {
            return Err(ValidationError::OutOfRange {
                field: "day".into(),
                value: offset,
                min: 0,
                max: last,
            }
            .into());
        }
        if !store.record_challenge_check_in(&challenge.id, day)? {
            return Err(CoreError::AlreadyRecorded {
                kind: "Challenge",
                id: challenge.id,
                day,
            });
        }

        challenge.check_ins = challenge.check_ins.saturating_add(1);
        let just_completed = challenge.check_ins >= challenge.duration_days;
        challenge.completed = just_completed;
        store.update_challenge(&challenge)?;
        if just_completed {
            tracing::info!(challenge = %challenge.id, "challenge completed");
        }

        let mut user = load_user(store, &challenge.user_id)?;
        let amount = apply_bonus(challenge.dp_reward, user.streak);
        let reward = ledger::award(
            store,
            &mut user,
            signed_amount(amount),
            RewardReason::ChallengeCheckIn(challenge.id.clone()),
        )?;

        Ok(ChallengeCheckIn {
            challenge,
            user,
            reward,
            just_completed,
        })
    })
}
