pub mod commands;
pub mod serve;
pub mod analyze;
pub mod metrics;

pub use commands::{Cli, Commands};

use std::path::PathBuf;
use crate::config::{self, GuardianConfig};
use crate::errors::GuardianError;

/// Load the configuration named on the command line, or the built-in defaults.
pub(crate) async fn load_config(path: Option<&str>) -> Result<(GuardianConfig, bool), GuardianError> {
    let path = path.map(PathBuf::from);
    let config = config::load_or_default(path.as_deref()).await?;
    Ok((config, path.is_some()))
}
