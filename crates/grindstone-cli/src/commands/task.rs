//! Task management commands for CLI.

use chrono::Utc;
use clap::Subcommand;
use grindstone_core::actions::{complete_task, create_task, delete_task, reopen_task};
use grindstone_core::{CoreError, Priority, RecordStore, TaskStatus};

use super::{open, print_json, touch, CmdResult};

#[derive(Subcommand)]
pub enum TaskAction {
    /// Create a new task
    Create {
        /// Task title
        title: String,
        /// Owning user ID
        #[arg(long)]
        user: String,
        /// Priority: low, medium or high
        #[arg(long, default_value = "medium")]
        priority: Priority,
    },
    /// List a user's tasks
    List {
        /// Owning user ID
        #[arg(long)]
        user: String,
        /// Only pending tasks
        #[arg(long)]
        pending: bool,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// Complete a task and collect its reward
    Complete {
        /// Task ID
        id: String,
    },
    /// Reopen a completed task, taking its reward back
    Reopen {
        /// Task ID
        id: String,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> CmdResult {
    let (db, config) = open()?;
    match action {
        TaskAction::Create {
            title,
            user,
            priority,
        } => {
            let task = create_task(&db, &user, &title, priority)?;
            print_json(&task)?;
        }
        TaskAction::List { user, pending } => {
            let tasks: Vec<_> = db
                .list_tasks(&user)?
                .into_iter()
                .filter(|t| !pending || t.status == TaskStatus::Pending)
                .collect();
            print_json(&tasks)?;
        }
        TaskAction::Get { id } => {
            let task = db
                .get_task(&id)?
                .ok_or_else(|| CoreError::NotFound { kind: "Task", id })?;
            print_json(&task)?;
        }
        TaskAction::Complete { id } => {
            if let Some(task) = db.get_task(&id)? {
                touch(&db, &config, &task.user_id)?;
            }
            let result = complete_task(&db, &config, &id, Utc::now())?;
            print_json(&result)?;
        }
        TaskAction::Reopen { id } => {
            let result = reopen_task(&db, &config, &id)?;
            print_json(&result)?;
        }
        TaskAction::Delete { id } => {
            let reversal = delete_task(&db, &config, &id)?;
            print_json(&serde_json::json!({ "deleted": id, "reversal": reversal }))?;
        }
    }
    Ok(())
}
