//! Command implementations.

mod run;
mod sources;
mod validate;

pub use run::run_stream;
pub use sources::run_sources;
pub use validate::run_validate;

use std::path::Path;

use contracts::StreamerConfig;

use crate::error::CliError;

/// Load configuration from `path`, or defaults when none is given
pub(crate) fn load_config(path: Option<&Path>) -> Result<StreamerConfig, CliError> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()));
        }
    }
    config_loader::ConfigLoader::load_or_default(path).map_err(|e| CliError::config(e.to_string()))
}
