//! Challenge commands.

use chrono::NaiveDate;
use clap::Subcommand;
use grindstone_core::actions::{check_in, create_challenge};
use grindstone_core::RecordStore;

use super::{open, print_json, today, touch, CmdResult};

#[derive(Subcommand)]
pub enum ChallengeAction {
    /// Start a challenge
    Create {
        /// Challenge title
        title: String,
        /// Owning user ID
        #[arg(long)]
        user: String,
        /// Length in days
        #[arg(long)]
        days: u32,
        /// First day (YYYY-MM-DD, default today)
        #[arg(long)]
        start: Option<NaiveDate>,
    },
    /// List a user's challenges
    List {
        /// Owning user ID
        #[arg(long)]
        user: String,
    },
    /// Check in for a day
    Checkin {
        /// Challenge ID
        id: String,
        /// Day of the check-in (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: ChallengeAction) -> CmdResult {
    let (db, config) = open()?;
    match action {
        ChallengeAction::Create {
            title,
            user,
            days,
            start,
        } => {
            let started_on = start.unwrap_or_else(|| today(&config));
            let challenge = create_challenge(&db, &config, &user, &title, days, started_on)?;
            print_json(&challenge)?;
        }
        ChallengeAction::List { user } => {
            print_json(&db.list_challenges(&user)?)?;
        }
        ChallengeAction::Checkin { id, date } => {
            if let Some(challenge) = db.get_challenge(&id)? {
                touch(&db, &config, &challenge.user_id)?;
            }
            let day = date.unwrap_or_else(|| today(&config));
            print_json(&check_in(&db, &id, day)?)?;
        }
    }
    Ok(())
}
