//! CI/CD Guardian: policy evaluation for pipeline reports with a two-tier
//! incident memory.

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod errors;
pub mod memory;
pub mod models;
pub mod notify;
pub mod policy;
