//! Goal milestone detection.
//!
//! Progress is split into quartiles: index `floor(progress / 25)`. Moving up
//! into quartile 1, 2 or 3 pays a milestone bonus per index crossed; reaching
//! 100 pays the completion bonus instead. Rewards only flow upward.

use serde::{Deserialize, Serialize};

/// Width of one milestone band in percent.
pub const MILESTONE_STEP: u8 = 25;

/// Progress value that counts as complete.
pub const COMPLETE: u8 = 100;

const COMPLETION_INDEX: u8 = COMPLETE / MILESTONE_STEP;

/// Quartile index of a progress value (0-4).
pub fn milestone_index(progress: u8) -> u8 {
    progress.min(COMPLETE) / MILESTONE_STEP
}

/// Outcome of a progress change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MilestoneCrossing {
    /// Nothing to reward.
    None,
    /// Indices `from + 1 ..= to` were crossed; one bonus each.
    Milestones { from: u8, to: u8 },
    /// Progress reached 100 for the first time.
    Completion,
}

impl MilestoneCrossing {
    /// Number of milestone bonuses to pay (0 for completion).
    pub fn milestone_count(&self) -> u8 {
        match self {
            MilestoneCrossing::Milestones { from, to } => to - from,
            _ => 0,
        }
    }

    pub fn is_completion(&self) -> bool {
        matches!(self, MilestoneCrossing::Completion)
    }
}

/// Classify a change from `old_progress` to `new_progress` (both 0-100).
pub fn detect(old_progress: u8, new_progress: u8) -> MilestoneCrossing {
    let old_progress = old_progress.min(COMPLETE);
    let new_progress = new_progress.min(COMPLETE);

    if new_progress >= COMPLETE && old_progress < COMPLETE {
        return MilestoneCrossing::Completion;
    }

    let from = milestone_index(old_progress);
    let to = milestone_index(new_progress);
    if to > from && to < COMPLETION_INDEX {
        MilestoneCrossing::Milestones { from, to }
    } else {
        MilestoneCrossing::None
    }
}
