//! XP, levels and the reward ledger.
//!
//! - [`level`]: XP -> capped level, plus display helpers
//! - [`streak`]: account-streak multiplier
//! - [`rewards`]: named base amounts per action type
//! - [`milestone`]: goal quartile crossings
//! - [`ledger`]: the only mutator of `User::xp` / `User::level`

pub mod ledger;
pub mod level;
pub mod milestone;
pub mod rewards;
pub mod streak;

pub use ledger::{
    award, deduct, rebuild_from_events, recalculate, signed_amount, DailyBonus, LedgerOutcome, Rebuild,
    Recalculation, RewardEvent, RewardReason,
};
pub use level::{level_of, progress_within_level, xp_ceiling_of, xp_floor_of, LevelSummary};
pub use milestone::{detect as detect_milestone, MilestoneCrossing};
pub use rewards::RewardTable;
pub use streak::{apply_bonus, multiplier_for};
