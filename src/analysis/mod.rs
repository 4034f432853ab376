//! Entry point tying policy evaluation to the two memory tiers.

pub mod orchestrator;

pub use orchestrator::{Analyzer, StoreStatus};
