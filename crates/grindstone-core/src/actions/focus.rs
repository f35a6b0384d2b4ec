//! Focus-session orchestrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::load_user;
use crate::error::{Result, ValidationError};
use crate::model::{FocusSession, User};
use crate::storage::{Config, RecordStore};
use crate::xp::ledger::{self, signed_amount, LedgerOutcome, RewardReason};
use crate::xp::streak::apply_bonus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusCompletion {
    pub session: FocusSession,
    pub user: User,
    pub reward: LedgerOutcome,
}

/// Record a finished focus session of `duration_min` minutes and pay for it.
///
/// # Errors
/// `Validation` for a zero-length session.
pub fn complete_focus_session<S: RecordStore>(
    store: &S,
    config: &Config,
    user_id: &str,
    label: &str,
    duration_min: u32,
    now: DateTime<Utc>,
) -> Result<FocusCompletion> {
    let base = config
        .rewards
        .focus(duration_min)
        .ok_or(ValidationError::OutOfRange {
            field: "duration_min".into(),
            value: duration_min as i64,
            min: 1,
            max: i64::from(u32::MAX),
        })?;

    store.transaction(|store| {
        let mut user = load_user(store, user_id)?;

        let mut session = FocusSession::new(&user.id, label.trim(), duration_min);
        session.dp_earned = apply_bonus(base, user.streak);
        session.completed_at = now;
        store.insert_focus_session(&session)?;

        let reward = ledger::award(
            store,
            &mut user,
            signed_amount(session.dp_earned),
            RewardReason::FocusSession(session.id.clone()),
        )?;

        Ok(FocusCompletion {
            session,
            user,
            reward,
        })
    })
}
