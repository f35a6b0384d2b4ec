pub mod challenge;
pub mod config;
pub mod events;
pub mod focus;
pub mod goal;
pub mod habit;
pub mod task;
pub mod user;

use chrono::{NaiveDate, Utc};
use grindstone_core::actions::record_activity;
use grindstone_core::{Config, Database};
use serde::Serialize;

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Open the store and configuration from the data directory.
pub fn open() -> Result<(Database, Config), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    Ok((db, config))
}

/// Today according to the configured day boundary.
pub fn today(config: &Config) -> NaiveDate {
    config.clock.day_of(Utc::now())
}

/// Bring the user's account streak up to date before paying a reward.
pub fn touch(db: &Database, config: &Config, user_id: &str) -> CmdResult {
    let update = record_activity(db, user_id, today(config))?;
    if update.changed {
        tracing::debug!(user = user_id, streak = update.user.streak, "activity recorded");
    }
    Ok(())
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
