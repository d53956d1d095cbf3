use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Settings read from the `rc` file.
///
/// The file is plain `key=value` lines; `#` starts a comment. Unknown keys
/// are ignored so older binaries keep working with newer files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub data_location: Option<PathBuf>,
    pub user_id: Option<String>,
    pub user_admin: bool,
}

impl Config {
    /// Directory holding the config file and default database
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".hubtrack"))
    }

    /// Path of the `rc` file
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("rc"))
    }

    /// Load the config file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&contents, path.parent())?
        } else {
            Self::default()
        };

        if let Ok(user) = std::env::var("HUBTRACK_USER") {
            if !user.trim().is_empty() {
                config.user_id = Some(user.trim().to_string());
            }
        }
        Ok(config)
    }

    /// Parse config text. Relative data paths resolve against `base_dir`.
    pub fn parse(contents: &str, base_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        for (lineno, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                anyhow::bail!("Invalid config line {}: '{}' (expected key=value)", lineno + 1, line);
            };
            let value = value.trim();

            match key.trim() {
                "data.location" => {
                    let path = PathBuf::from(value);
                    config.data_location = Some(match base_dir {
                        Some(base) if path.is_relative() => base.join(path),
                        _ => path,
                    });
                }
                "user.id" => {
                    config.user_id = if value.is_empty() { None } else { Some(value.to_string()) };
                }
                "user.admin" => {
                    config.user_admin = match value {
                        "true" | "yes" | "1" => true,
                        "false" | "no" | "0" => false,
                        other => anyhow::bail!("Invalid value for user.admin: '{}'", other),
                    };
                }
                other => {
                    log::debug!("Ignoring unknown config key '{}'", other);
                }
            }
        }

        Ok(config)
    }
}
