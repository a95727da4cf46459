// src/lib.rs
//! Watches game-content APIs for newly published image assets and announces
//! them to a Discord channel.

pub mod config;
pub mod cycle;
pub mod diff;
pub mod extract;
pub mod notify;
pub mod poll;
pub mod scheduler;
pub mod store;
pub mod telemetry;

use std::collections::BTreeSet;

/// A set of asset URLs. Ordered so that diffs, state files and delivery order
/// are reproducible.
pub type AssetSet = BTreeSet<String>;

pub use crate::config::AppConfig;
pub use crate::cycle::{CycleReport, UpdateOrchestrator};
pub use crate::notify::{DiscordNotifier, Notifier};
pub use crate::poll::{PollOutcome, SourcePoller};
pub use crate::store::DiffStore;
