//! Resolution of which renderer executable to invoke.

use std::path::{Path, PathBuf};
use tracing::debug;

use super::config::RendererConfig;
use super::types::RendererVariant;
use crate::config::ConfigError;

/// Renderer executables, validated once at startup.
///
/// Immutable after construction; share it behind an `Arc` or clone it into
/// each component that spawns the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutablePaths {
    primary: PathBuf,
    secondary: Option<PathBuf>,
}

impl ExecutablePaths {
    /// Validates the configured executables.
    ///
    /// The primary executable must be configured and exist. The secondary one
    /// is optional, but must exist when configured.
    pub fn from_config(config: &RendererConfig) -> Result<Self, ConfigError> {
        let primary = config
            .primary_executable
            .clone()
            .ok_or(ConfigError::MissingExecutable {
                key: "renderer.primary_executable",
            })?;
        ensure_exists("renderer.primary_executable", &primary)?;

        let secondary = match &config.secondary_executable {
            Some(path) => {
                ensure_exists("renderer.secondary_executable", path)?;
                Some(path.clone())
            }
            None => None,
        };

        Ok(Self { primary, secondary })
    }

    /// The primary executable.
    pub fn primary(&self) -> &Path {
        &self.primary
    }

    /// Whether the alternate build is available.
    pub fn secondary_available(&self) -> bool {
        self.secondary.is_some()
    }

    /// Executable to run for the requested variant.
    ///
    /// Requesting the secondary build when none is configured runs the primary.
    pub fn resolve(&self, variant: RendererVariant) -> &Path {
        match (variant, &self.secondary) {
            (RendererVariant::Secondary, Some(secondary)) => secondary,
            (RendererVariant::Secondary, None) => {
                debug!("Secondary renderer not configured, using primary");
                &self.primary
            }
            (RendererVariant::Primary, _) => &self.primary,
        }
    }
}

fn ensure_exists(key: &'static str, path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        Ok(())
    } else {
        Err(ConfigError::ExecutableNotFound {
            key,
            path: path.to_path_buf(),
        })
    }
}
