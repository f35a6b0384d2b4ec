use clap::Subcommand;
use grindstone_core::xp::ledger::xp_from_events;
use grindstone_core::RecordStore;
use serde_json::json;

use super::{open, print_json, CmdResult};

#[derive(Subcommand)]
pub enum EventsAction {
    /// List a user's reward log, oldest first
    List {
        /// Owning user ID
        #[arg(long)]
        user: String,
        /// Only the most recent N events
        #[arg(long)]
        limit: Option<usize>,
    },
}

pub fn run(action: EventsAction) -> CmdResult {
    let (db, _config) = open()?;
    match action {
        EventsAction::List { user, limit } => {
            let events = db.list_events(&user)?;
            let total = xp_from_events(&events);
            let skip = limit.map_or(0, |n| events.len().saturating_sub(n));
            print_json(&json!({
                "total_xp": total,
                "events": &events[skip..],
            }))?;
        }
    }
    Ok(())
}
