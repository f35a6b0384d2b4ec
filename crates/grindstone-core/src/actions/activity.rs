//! Account-streak upkeep.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::load_user;
use crate::error::Result;
use crate::model::User;
use crate::storage::RecordStore;
use crate::xp::streak::next_streak;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityUpdate {
    pub user: User,
    pub previous_streak: u32,
    pub changed: bool,
}

/// Mark `user_id` active on `today`, extending or resetting the account
/// streak. A repeat call for the same day writes nothing.
pub fn record_activity<S: RecordStore>(
    store: &S,
    user_id: &str,
    today: NaiveDate,
) -> Result<ActivityUpdate> {
    store.transaction(|store| {
        let mut user = load_user(store, user_id)?;
        let previous_streak = user.streak;

        let streak = next_streak(user.last_active_on, today, user.streak);
        let last_active_on = match user.last_active_on {
            Some(last) if last > today => Some(last),
            _ => Some(today),
        };

        let changed = streak != user.streak || last_active_on != user.last_active_on;
        if changed {
            user.streak = streak;
            user.last_active_on = last_active_on;
            store.save_user(&mut user)?;
            tracing::debug!(user = %user.id, previous_streak, streak, "account streak updated");
        }

        Ok(ActivityUpdate {
            user,
            previous_streak,
            changed,
        })
    })
}
