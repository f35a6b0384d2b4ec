//! # Grindstone Core Library
//!
//! This library provides the reward engine for the Grindstone productivity
//! tracker. Every user action that earns points (completing a task or habit,
//! crossing a goal milestone, finishing a focus session, checking in on a
//! challenge) flows through one ledger that owns the user's XP and level.
//! The `grindstone` CLI is a thin layer over the same library.
//!
//! ## Architecture
//!
//! - **XP**: level derivation, the streak multiplier, the reward table,
//!   milestone detection and the ledger (the only writer of XP and level)
//! - **Actions**: one orchestrator per action type; each computes a base
//!   reward, applies the streak bonus and hands the result to the ledger
//! - **Storage**: SQLite record store with an append-only reward log and
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`RecordStore`]: persistence seen by the engine
//! - [`Database`]: SQLite implementation of [`RecordStore`]
//! - [`Config`]: reward table, refund policy and day boundary

pub mod actions;
pub mod error;
pub mod model;
pub mod storage;
pub mod xp;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use model::{Challenge, FocusSession, Goal, Habit, Priority, Task, TaskStatus, User};
pub use storage::{Config, Database, RecordStore, RefundPolicy};
pub use xp::{LedgerOutcome, LevelSummary, RewardEvent, RewardReason, RewardTable};
