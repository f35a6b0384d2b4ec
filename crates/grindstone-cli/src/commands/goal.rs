//! Goal commands.

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use grindstone_core::actions::{create_goal, update_goal_progress};
use grindstone_core::RecordStore;

use super::{open, print_json, touch, CmdResult};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create a goal
    Create {
        /// Goal title
        title: String,
        /// Owning user ID
        #[arg(long)]
        user: String,
        /// Free-form category
        #[arg(long)]
        category: Option<String>,
        /// Deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<NaiveDate>,
    },
    /// List a user's goals
    List {
        /// Owning user ID
        #[arg(long)]
        user: String,
    },
    /// Set progress in percent (clamped to 0-100)
    Progress {
        /// Goal ID
        id: String,
        /// New progress
        #[arg(allow_hyphen_values = true)]
        percent: i32,
    },
}

pub fn run(action: GoalAction) -> CmdResult {
    let (db, config) = open()?;
    match action {
        GoalAction::Create {
            title,
            user,
            category,
            deadline,
        } => {
            let goal = create_goal(&db, &user, &title, category.as_deref(), deadline)?;
            print_json(&goal)?;
        }
        GoalAction::List { user } => {
            print_json(&db.list_goals(&user)?)?;
        }
        GoalAction::Progress { id, percent } => {
            if let Some(goal) = db.get_goal(&id)? {
                touch(&db, &config, &goal.user_id)?;
            }
            let result = update_goal_progress(&db, &config, &id, percent, Utc::now())?;
            print_json(&result)?;
        }
    }
    Ok(())
}
