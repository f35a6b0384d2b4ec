//! Habit commands.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use grindstone_core::actions::{complete_habit, create_habit};
use grindstone_core::RecordStore;

use super::{open, print_json, today, touch, CmdResult};

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a habit
    Create {
        /// Habit name
        name: String,
        /// Owning user ID
        #[arg(long)]
        user: String,
    },
    /// List a user's habits
    List {
        /// Owning user ID
        #[arg(long)]
        user: String,
    },
    /// Mark a habit done
    Complete {
        /// Habit ID
        id: String,
        /// Day of the completion (YYYY-MM-DD, default today; no later than
        /// today and no earlier than the habit's creation day)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

pub fn run(action: HabitAction) -> CmdResult {
    let (db, config) = open()?;
    match action {
        HabitAction::Create { name, user } => {
            print_json(&create_habit(&db, &user, &name, Utc::now())?)?;
        }
        HabitAction::List { user } => {
            print_json(&db.list_habits(&user)?)?;
        }
        HabitAction::Complete { id, date } => {
            if let Some(habit) = db.get_habit(&id)? {
                touch(&db, &config, &habit.user_id)?;
            }
            let day = date.unwrap_or_else(|| today(&config));
            print_json(&complete_habit(&db, &config, &id, day, Utc::now())?)?;
        }
    }
    Ok(())
}
