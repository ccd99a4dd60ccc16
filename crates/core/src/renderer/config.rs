//! Configuration for the renderer module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for running the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Path to the primary renderer executable. Required.
    #[serde(default)]
    pub primary_executable: Option<PathBuf>,

    /// Path to an alternate renderer build.
    #[serde(default)]
    pub secondary_executable: Option<PathBuf>,

    /// Directory holding the Python scripts run inside the renderer.
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: PathBuf,

    /// Additional arguments placed after the scene file.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_scripts_dir() -> PathBuf {
    PathBuf::from("scripts")
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            primary_executable: None,
            secondary_executable: None,
            scripts_dir: default_scripts_dir(),
            extra_args: Vec::new(),
        }
    }
}

impl RendererConfig {
    /// Creates a config with the given primary executable.
    pub fn with_primary(primary_executable: impl Into<PathBuf>) -> Self {
        Self {
            primary_executable: Some(primary_executable.into()),
            ..Default::default()
        }
    }

    /// Sets the alternate executable.
    pub fn with_secondary(mut self, secondary_executable: impl Into<PathBuf>) -> Self {
        self.secondary_executable = Some(secondary_executable.into());
        self
    }

    /// Sets the scripts directory.
    pub fn with_scripts_dir(mut self, scripts_dir: impl Into<PathBuf>) -> Self {
        self.scripts_dir = scripts_dir.into();
        self
    }

    /// Full path of one of the renderer scripts.
    pub fn script_path(&self, script: Script) -> PathBuf {
        self.scripts_dir.join(script.file_name())
    }
}

/// Scripts run inside the renderer with `-P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Prints the scene's frame range as a sentinel payload.
    GetData,
    /// Prints the available compute devices as a sentinel payload.
    GetDevices,
    /// Renders the scene according to a JSON parameter argument.
    Render,
}

impl Script {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::GetData => "get_data.py",
            Self::GetDevices => "get_devices.py",
            Self::Render => "render.py",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RendererConfig::default();
        assert!(config.primary_executable.is_none());
        assert!(config.secondary_executable.is_none());
        assert_eq!(config.scripts_dir, PathBuf::from("scripts"));
        assert!(config.extra_args.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = RendererConfig::with_primary("/opt/blender-2.83/blender")
            .with_secondary("/opt/blender-2.91/blender")
            .with_scripts_dir("/srv/farm/scripts");

        assert_eq!(
            config.primary_executable,
            Some(PathBuf::from("/opt/blender-2.83/blender"))
        );
        assert_eq!(
            config.secondary_executable,
            Some(PathBuf::from("/opt/blender-2.91/blender"))
        );
        assert_eq!(
            config.script_path(Script::Render),
            PathBuf::from("/srv/farm/scripts/render.py")
        );
    }

    #[test]
    fn test_config_serialization() {
        let config = RendererConfig::with_primary("/usr/bin/blender");
        let json = serde_json::to_string(&config).unwrap();
        let parsed: RendererConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.primary_executable, config.primary_executable);
        assert_eq!(parsed.scripts_dir, config.scripts_dir);
    }
}
