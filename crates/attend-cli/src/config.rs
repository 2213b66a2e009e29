//! Configuration loading and management.

use std::path::{Path, PathBuf};

use attend_core::DEFAULT_LOCATION;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Location recorded for scans that do not name one.
    pub default_location: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("attend.db"),
            default_location: DEFAULT_LOCATION.to_string(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (ATTEND_*)
        figment = figment.merge(Env::prefixed("ATTEND_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for attend.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("attend"))
}

/// Returns the platform-specific data directory for attend.
///
/// On Linux: `~/.local/share/attend`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("attend"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_attend() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "attend");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("attend.db"));
        assert_eq!(config.default_location, "Unknown");
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("attend.toml");
        std::fs::write(
            &path,
            "database_path = \"/srv/attend/school.db\"\ndefault_location = \"Main gate\"\n",
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/srv/attend/school.db"));
        assert_eq!(config.default_location, "Main gate");
    }
}
