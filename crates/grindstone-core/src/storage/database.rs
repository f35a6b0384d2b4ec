//! SQLite-based record store.
//!
//! Provides persistent storage for:
//! - The user aggregate (with an optimistic-concurrency version)
//! - Tasks, goals, habits, focus sessions and challenges
//! - The append-only reward log and per-day bonus flags

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use super::{data_dir, migrations, RecordStore};
use crate::error::{CoreError, DatabaseError, Result};
use crate::model::{Challenge, FocusSession, Goal, Habit, Priority, Task, TaskStatus, User};
use crate::xp::ledger::{DailyBonus, RewardEvent, RewardReason};

// === Helper Functions ===

const DAY_FORMAT: &str = "%Y-%m-%d";

fn parse_priority(s: &str) -> Priority {
    match s {
        "low" => Priority::Low,
        "high" => Priority::High,
        _ => Priority::Medium,
    }
}

fn parse_task_status(s: &str) -> TaskStatus {
    match s {
        "completed" => TaskStatus::Completed,
        _ => TaskStatus::Pending,
    }
}

/// Parse datetime from RFC3339 string with fallback to the epoch
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

fn parse_datetime_opt(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_datetime)
}

fn parse_day(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DAY_FORMAT).ok()
}

fn parse_day_opt(s: Option<String>) -> Option<NaiveDate> {
    s.as_deref().and_then(parse_day)
}

fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        xp: row.get::<_, i64>(2)?.max(0) as u64,
        level: row.get(3)?,
        streak: row.get(4)?,
        last_active_on: parse_day_opt(row.get(5)?),
        total_tasks_completed: row.get(6)?,
        version: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const USER_COLUMNS: &str =
    "id, name, xp, level, streak, last_active_on, total_tasks_completed, version, created_at";

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        priority: parse_priority(&row.get::<_, String>(3)?),
        status: parse_task_status(&row.get::<_, String>(4)?),
        xp_awarded: row.get::<_, i64>(5)?.max(0) as u64,
        xp_deducted: row.get::<_, i64>(6)?.max(0) as u64,
        completed_at: parse_datetime_opt(row.get(7)?),
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const TASK_COLUMNS: &str =
    "id, user_id, title, priority, status, xp_awarded, xp_deducted, completed_at, created_at";

fn row_to_goal(row: &Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        category: row.get(3)?,
        deadline: parse_day_opt(row.get(4)?),
        progress: row.get::<_, i64>(5)?.clamp(0, 100) as u8,
        milestones_rewarded: row.get::<_, i64>(6)?.clamp(0, 3) as u8,
        completion_rewarded: row.get(7)?,
        completed_at: parse_datetime_opt(row.get(8)?),
        created_at: parse_datetime(&row.get::<_, String>(9)?),
    })
}

const GOAL_COLUMNS: &str = "id, user_id, title, category, deadline, progress, milestones_rewarded, completion_rewarded, completed_at, created_at";

fn row_to_habit(row: &Row) -> rusqlite::Result<Habit> {
    Ok(Habit {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        streak: row.get(3)?,
        longest_streak: row.get(4)?,
        total_completions: row.get(5)?,
        last_completed_on: parse_day_opt(row.get(6)?),
        created_at: parse_datetime(&row.get::<_, String>(7)?),
    })
}

const HABIT_COLUMNS: &str =
    "id, user_id, name, streak, longest_streak, total_completions, last_completed_on, created_at";

fn row_to_focus_session(row: &Row) -> rusqlite::Result<FocusSession> {
    Ok(FocusSession {
        id: row.get(0)?,
        user_id: row.get(1)?,
        label: row.get(2)?,
        duration_min: row.get(3)?,
        dp_earned: row.get::<_, i64>(4)?.max(0) as u64,
        completed_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn row_to_challenge(row: &Row) -> rusqlite::Result<Challenge> {
    let started_on: String = row.get(6)?;
    Ok(Challenge {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        duration_days: row.get(3)?,
        dp_reward: row.get::<_, i64>(4)?.max(0) as u64,
        check_ins: row.get(5)?,
        started_on: parse_day(&started_on).unwrap_or_default(),
        completed: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}

const CHALLENGE_COLUMNS: &str =
    "id, user_id, title, duration_days, dp_reward, check_ins, started_on, completed, created_at";

fn row_to_event(row: &Row) -> rusqlite::Result<RewardEvent> {
    let kind: String = row.get(3)?;
    let source: String = row.get(4)?;
    let reason = RewardReason::from_parts(&kind, &source)
        .unwrap_or_else(|| RewardReason::Manual(format!("{kind}:{source}")));
    Ok(RewardEvent {
        id: row.get(0)?,
        user_id: row.get(1)?,
        delta: row.get(2)?,
        reason,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

/// SQLite-backed [`RecordStore`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data dir>/grindstone.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("grindstone.db"))
    }

    /// Open (or create) the database file at `path`.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    fn query_list<T>(
        &self,
        sql: &str,
        param: &str,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![param], map)?;
        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }

    fn query_one<T>(
        &self,
        sql: &str,
        id: &str,
        map: fn(&Row) -> rusqlite::Result<T>,
    ) -> Result<Option<T>> {
        Ok(self.conn.query_row(sql, params![id], map).optional()?)
    }

    fn expect_changed(changed: usize, kind: &'static str, id: &str) -> Result<()> {
        if changed == 0 {
            Err(CoreError::not_found(kind, id))
        } else {
            Ok(())
        }
    }
}

impl RecordStore for Database {
    fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // === Users ===

    fn insert_user(&self, user: &User) -> Result<()> {
        self.conn.execute(
            "INSERT INTO users (id, name, xp, level, streak, last_active_on, total_tasks_completed, version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id,
                user.name,
                user.xp as i64,
                user.level,
                user.streak,
                user.last_active_on.map(format_day),
                user.total_tasks_completed,
                user.version,
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.query_one(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            id,
            row_to_user,
        )
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"))?;
        let rows = stmt.query_map([], row_to_user)?;
        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    fn save_user(&self, user: &mut User) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET name = ?3,
                 xp = ?4,
                 level = ?5,
                 streak = ?6,
                 last_active_on = ?7,
                 total_tasks_completed = ?8,
                 version = version + 1
             WHERE id = ?1 AND version = ?2",
            params![
                user.id,
                user.version,
                user.name,
                user.xp as i64,
                user.level,
                user.streak,
                user.last_active_on.map(format_day),
                user.total_tasks_completed,
            ],
        )?;

        if changed == 0 {
            return match self.get_user(&user.id)? {
                None => Err(CoreError::not_found("User", &user.id)),
                Some(_) => {
                    tracing::warn!(user = %user.id, version = user.version, "stale user write rejected");
                    Err(CoreError::Conflict {
                        user_id: user.id.clone(),
                        expected: user.version,
                    })
                }
            };
        }

        user.version += 1;
        Ok(())
    }

    // === Tasks ===

    fn insert_task(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            "INSERT INTO tasks (id, user_id, title, priority, status, xp_awarded, xp_deducted, completed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                task.id,
                task.user_id,
                task.title,
                task.priority.as_str(),
                task.status.as_str(),
                task.xp_awarded as i64,
                task.xp_deducted as i64,
                task.completed_at.map(|dt| dt.to_rfc3339()),
                task.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.query_one(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"),
            id,
            row_to_task,
        )
    }

    fn list_tasks(&self, user_id: &str) -> Result<Vec<Task>> {
        self.query_list(
            &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY created_at ASC"),
            user_id,
            row_to_task,
        )
    }

    fn update_task(&self, task: &Task) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET title = ?2, priority = ?3, status = ?4, xp_awarded = ?5, xp_deducted = ?6, completed_at = ?7
             WHERE id = ?1",
            params![
                task.id,
                task.title,
                task.priority.as_str(),
                task.status.as_str(),
                task.xp_awarded as i64,
                task.xp_deducted as i64,
                task.completed_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Self::expect_changed(changed, "Task", &task.id)
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1", params![id])?;
        Self::expect_changed(changed, "Task", id)
    }

    fn count_tasks_completed_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32> {
        // RFC 3339 strings with a fixed +00:00 offset sort chronologically
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks
             WHERE user_id = ?1 AND status = 'completed'
               AND completed_at >= ?2 AND completed_at < ?3",
            params![user_id, start.to_rfc3339(), end.to_rfc3339()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_pending_tasks(&self, user_id: &str) -> Result<u32> {
        let count: u32 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE user_id = ?1 AND status = 'pending'",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // === Goals ===

    fn insert_goal(&self, goal: &Goal) -> Result<()> {
        self.conn.execute(
            "INSERT INTO goals (id, user_id, title, category, deadline, progress, milestones_rewarded, completion_rewarded, completed_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                goal.id,
                goal.user_id,
                goal.title,
                goal.category,
                goal.deadline.map(format_day),
                goal.progress,
                goal.milestones_rewarded,
                goal.completion_rewarded,
                goal.completed_at.map(|dt| dt.to_rfc3339()),
                goal.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_goal(&self, id: &str) -> Result<Option<Goal>> {
        self.query_one(
            &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE id = ?1"),
            id,
            row_to_goal,
        )
    }

    fn list_goals(&self, user_id: &str) -> Result<Vec<Goal>> {
        self.query_list(
            &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE user_id = ?1 ORDER BY created_at ASC"),
            user_id,
            row_to_goal,
        )
    }

    fn update_goal(&self, goal: &Goal) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE goals
             SET title = ?2, category = ?3, deadline = ?4, progress = ?5,
                 milestones_rewarded = ?6, completion_rewarded = ?7, completed_at = ?8
             WHERE id = ?1",
            params![
                goal.id,
                goal.title,
                goal.category,
                goal.deadline.map(format_day),
                goal.progress,
                goal.milestones_rewarded,
                goal.completion_rewarded,
                goal.completed_at.map(|dt| dt.to_rfc3339()),
            ],
        )?;
        Self::expect_changed(changed, "Goal", &goal.id)
    }

    // === Habits ===

    fn insert_habit(&self, habit: &Habit) -> Result<()> {
        self.conn.execute(
            "INSERT INTO habits (id, user_id, name, streak, longest_streak, total_completions, last_completed_on, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                habit.id,
                habit.user_id,
                habit.name,
                habit.streak,
                habit.longest_streak,
                habit.total_completions,
                habit.last_completed_on.map(format_day),
                habit.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_habit(&self, id: &str) -> Result<Option<Habit>> {
        self.query_one(
            &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1"),
            id,
            row_to_habit,
        )
    }

    fn list_habits(&self, user_id: &str) -> Result<Vec<Habit>> {
        self.query_list(
            &format!("SELECT {HABIT_COLUMNS} FROM habits WHERE user_id = ?1 ORDER BY created_at ASC"),
            user_id,
            row_to_habit,
        )
    }

    fn update_habit(&self, habit: &Habit) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE habits
             SET name = ?2, streak = ?3, longest_streak = ?4, total_completions = ?5, last_completed_on = ?6
             WHERE id = ?1",
            params![
                habit.id,
                habit.name,
                habit.streak,
                habit.longest_streak,
                habit.total_completions,
                habit.last_completed_on.map(format_day),
            ],
        )?;
        Self::expect_changed(changed, "Habit", &habit.id)
    }

    fn record_habit_completion(&self, habit_id: &str, day: NaiveDate) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO habit_completions (habit_id, day) VALUES (?1, ?2)",
            params![habit_id, format_day(day)],
        )?;
        Ok(inserted == 1)
    }

    // === Focus sessions ===

    fn insert_focus_session(&self, session: &FocusSession) -> Result<()> {
        self.conn.execute(
            "INSERT INTO focus_sessions (id, user_id, label, duration_min, dp_earned, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.id,
                session.user_id,
                session.label,
                session.duration_min,
                session.dp_earned as i64,
                session.completed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn list_focus_sessions(&self, user_id: &str) -> Result<Vec<FocusSession>> {
        self.query_list(
            "SELECT id, user_id, label, duration_min, dp_earned, completed_at
             FROM focus_sessions WHERE user_id = ?1 ORDER BY completed_at ASC",
            user_id,
            row_to_focus_session,
        )
    }

    // === Challenges ===

    fn insert_challenge(&self, challenge: &Challenge) -> Result<()> {
        self.conn.execute(
            "INSERT INTO challenges (id, user_id, title, duration_days, dp_reward, check_ins, started_on, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                challenge.id,
                challenge.user_id,
                challenge.title,
                challenge.duration_days,
                challenge.dp_reward as i64,
                challenge.check_ins,
                format_day(challenge.started_on),
                challenge.completed,
                challenge.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_challenge(&self, id: &str) -> Result<Option<Challenge>> {
        self.query_one(
            &format!("SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE id = ?1"),
            id,
            row_to_challenge,
        )
    }

    fn list_challenges(&self, user_id: &str) -> Result<Vec<Challenge>> {
        self.query_list(
            &format!(
                "SELECT {CHALLENGE_COLUMNS} FROM challenges WHERE user_id = ?1 ORDER BY created_at ASC"
            ),
            user_id,
            row_to_challenge,
        )
    }

    fn update_challenge(&self, challenge: &Challenge) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE challenges SET title = ?2, check_ins = ?3, completed = ?4 WHERE id = ?1",
            params![
                challenge.id,
                challenge.title,
                challenge.check_ins,
                challenge.completed,
            ],
        )?;
        Self::expect_changed(changed, "Challenge", &challenge.id)
    }

    fn record_challenge_check_in(&self, challenge_id: &str, day: NaiveDate) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO challenge_checkins (challenge_id, day) VALUES (?1, ?2)",
            params![challenge_id, format_day(day)],
        )?;
        Ok(inserted == 1)
    }

    // === Reward log ===

    fn append_event(&self, event: &RewardEvent) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO reward_events (user_id, delta, reason, source, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.user_id,
                event.delta,
                event.reason.kind(),
                event.reason.source(),
                event.created_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_events(&self, user_id: &str) -> Result<Vec<RewardEvent>> {
        self.query_list(
            "SELECT id, user_id, delta, reason, source, created_at
             FROM reward_events WHERE user_id = ?1 ORDER BY id ASC",
            user_id,
            row_to_event,
        )
    }

    fn sum_event_deltas(&self, user_id: &str) -> Result<i64> {
        let sum: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(delta), 0) FROM reward_events WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    fn claim_daily_bonus(&self, user_id: &str, day: NaiveDate, kind: DailyBonus) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO daily_bonuses (user_id, day, kind, granted_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, format_day(day), kind.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(inserted == 1)
    }
}
