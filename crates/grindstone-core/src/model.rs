//! Records owned by the record store: the user aggregate and the
//! reward-bearing entities (tasks, goals, habits, focus sessions, challenges).
//!
//! `User::xp` and `User::level` are only ever assigned by
//! [`crate::xp::ledger`]; everything else here is plain data.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::xp::level::level_of;

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// The user aggregate. Single source of truth for XP, level and streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    /// Ledger total, never negative.
    pub xp: u64,
    /// Derived from `xp`; see [`level_of`].
    pub level: u32,
    /// Consecutive active days at the account level.
    pub streak: u32,
    pub last_active_on: Option<NaiveDate>,
    pub total_tasks_completed: u32,
    /// Bumped by every successful save; used for compare-and-swap.
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id("user"),
            name: name.into(),
            xp: 0,
            level: level_of(0),
            streak: 0,
            last_active_on: None,
            total_tasks_completed: 0,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Whether the stored level matches the one derived from XP.
    pub fn level_is_consistent(&self) -> bool {
        self.level == level_of(self.xp)
    }
}

/// Task priority; selects the task's base reward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("expected low, medium or high, got '{other}'"),
            }),
        }
    }
}

/// Task status. The only transitions are `Pending -> Completed` and back.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn can_transition_to(&self, to: TaskStatus) -> bool {
        *self != to
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub priority: Priority,
    pub status: TaskStatus,
    /// XP granted by the last completion (audit trail only).
    pub xp_awarded: u64,
    /// XP taken back by the last reopen (audit trail only).
    pub xp_deducted: u64,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: new_id("task"),
            user_id: user_id.into(),
            title: title.into(),
            priority,
            status: TaskStatus::Pending,
            xp_awarded: 0,
            xp_deducted: 0,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}

/// A goal tracked as percentage progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub category: Option<String>,
    pub deadline: Option<NaiveDate>,
    /// 0-100, clamped on every update.
    pub progress: u8,
    /// Highest quartile index (0-3) already rewarded.
    pub milestones_rewarded: u8,
    pub completion_rewarded: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: new_id("goal"),
            user_id: user_id.into(),
            title: title.into(),
            category: None,
            deadline: None,
            progress: 0,
            milestones_rewarded: 0,
            completion_rewarded: false,
            completed_at: None,
            created_at: Utc::now(),
        }
    }
}

/// A recurring habit with its own streak, distinct from the account streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub streak: u32,
    pub longest_streak: u32,
    pub total_completions: u32,
    pub last_completed_on: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl Habit {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: new_id("habit"),
            user_id: user_id.into(),
            name: name.into(),
            streak: 0,
            longest_streak: 0,
            total_completions: 0,
            last_completed_on: None,
            created_at: Utc::now(),
        }
    }
}

/// A completed focus session and the points it earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: String,
    pub user_id: String,
    pub label: String,
    pub duration_min: u32,
    pub dp_earned: u64,
    pub completed_at: DateTime<Utc>,
}

impl FocusSession {
    pub fn new(user_id: impl Into<String>, label: impl Into<String>, duration_min: u32) -> Self {
        Self {
            id: new_id("focus"),
            user_id: user_id.into(),
            label: label.into(),
            duration_min,
            dp_earned: 0,
            completed_at: Utc::now(),
        }
    }
}

/// A multi-day challenge with a daily check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub duration_days: u32,
    /// Points per check-in, fixed when the challenge is created.
    pub dp_reward: u64,
    pub check_ins: u32,
    pub started_on: NaiveDate,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Challenge {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        duration_days: u32,
        dp_reward: u64,
        started_on: NaiveDate,
    ) -> Self {
        Self {
            id: new_id("challenge"),
            user_id: user_id.into(),
            title: title.into(),
            duration_days,
            dp_reward,
            check_ins: 0,
            started_on,
            completed: false,
            created_at: Utc::now(),
        }
    }
}
