use tracing::debug;

use super::{types::Config, ConfigError};
use crate::renderer::ExecutablePaths;

/// Validate configuration and resolve the renderer executables.
///
/// Fails when:
/// - the primary executable is not configured or does not exist
/// - a configured secondary executable does not exist
/// - the scripts directory is not a directory
pub fn validate_config(config: &Config) -> Result<ExecutablePaths, ConfigError> {
    let executables = ExecutablePaths::from_config(&config.renderer)?;

    if !config.renderer.scripts_dir.is_dir() {
        return Err(ConfigError::ValidationError(format!(
            "renderer.scripts_dir is not a directory: {}",
            config.renderer.scripts_dir.display()
        )));
    }

    debug!(
        primary = %executables.primary().display(),
        secondary_available = executables.secondary_available(),
        "Renderer executables resolved"
    );

    Ok(executables)
}
