//! User account commands.

use clap::Subcommand;
use grindstone_core::actions::{create_user, load_user};
use grindstone_core::xp::{rebuild_from_events, recalculate};
use grindstone_core::{LevelSummary, RecordStore};
use serde_json::json;

use super::{open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum UserAction {
    /// Create a user
    Create {
        /// Display name
        name: String,
    },
    /// Show a user with level progress
    Show {
        /// User ID
        id: String,
    },
    /// List users
    List,
    /// Re-derive the level from XP
    Recalculate {
        /// User ID
        id: String,
    },
    /// Re-derive XP from the reward log, then the level
    Rebuild {
        /// User ID
        id: String,
    },
}

pub fn run(action: UserAction) -> CmdResult {
    let (db, _config) = open()?;
    match action {
        UserAction::Create { name } => {
            let user = create_user(&db, &name)?;
            print_json(&user)?;
        }
        UserAction::Show { id } => {
            let user = load_user(&db, &id)?;
            let level = LevelSummary::for_xp(user.xp);
            print_json(&json!({ "user": user, "level": level }))?;
        }
        UserAction::List => {
            print_json(&db.list_users()?)?;
        }
        UserAction::Recalculate { id } => {
            let mut user = load_user(&db, &id)?;
            let result = db.transaction(|db| recalculate(db, &mut user))?;
            print_json(&result)?;
        }
        UserAction::Rebuild { id } => {
            let mut user = load_user(&db, &id)?;
            let result = db.transaction(|db| rebuild_from_events(db, &mut user))?;
            print_json(&result)?;
        }
    }
    Ok(())
}
