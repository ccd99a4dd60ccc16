use serde::{Deserialize, Serialize};

use crate::renderer::RendererConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub renderer: RendererConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON log lines instead of human readable ones
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[renderer]
primary_executable = "/opt/blender-2.83/blender"
secondary_executable = "/opt/blender-2.91/blender"
scripts_dir = "/srv/farm/scripts"
extra_args = ["--factory-startup"]

[logging]
level = "debug"
json = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(
            config.renderer.primary_executable,
            Some(PathBuf::from("/opt/blender-2.83/blender"))
        );
        assert_eq!(
            config.renderer.secondary_executable,
            Some(PathBuf::from("/opt/blender-2.91/blender"))
        );
        assert_eq!(config.renderer.scripts_dir, PathBuf::from("/srv/farm/scripts"));
        assert_eq!(config.renderer.extra_args, vec!["--factory-startup"]);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[renderer]
primary_executable = "/usr/bin/blender"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.renderer.secondary_executable.is_none());
        assert_eq!(config.renderer.scripts_dir, PathBuf::from("scripts"));
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_missing_primary_still_parses() {
        // Reported by validation with a dedicated error, not as a parse failure.
        let config: Config = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        assert!(config.renderer.primary_executable.is_none());
    }
}
