//! Focus session commands.

use chrono::Utc;
use clap::Subcommand;
use grindstone_core::actions::complete_focus_session;
use grindstone_core::RecordStore;

use super::{open, print_json, touch, CmdResult};

#[derive(Subcommand)]
pub enum FocusAction {
    /// Record a finished focus session
    Complete {
        /// Owning user ID
        #[arg(long)]
        user: String,
        /// Session length in minutes
        #[arg(long)]
        minutes: u32,
        /// What the session was about
        #[arg(long, default_value = "focus")]
        label: String,
    },
    /// List a user's focus sessions
    List {
        /// Owning user ID
        #[arg(long)]
        user: String,
    },
}

pub fn run(action: FocusAction) -> CmdResult {
    let (db, config) = open()?;
    match action {
        FocusAction::Complete {
            user,
            minutes,
            label,
        } => {
            touch(&db, &config, &user)?;
            let result = complete_focus_session(&db, &config, &user, &label, minutes, Utc::now())?;
            print_json(&result)?;
        }
        FocusAction::List { user } => {
            print_json(&db.list_focus_sessions(&user)?)?;
        }
    }
    Ok(())
}
