// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `CABLETRACE_*` environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "CABLETRACE";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding topology.json
    pub data_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Colored terminal output
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "warn".to_string(),
            color: true,
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "hyperpolymath", "cabletrace")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".cabletrace"))
}

/// Load configuration, reading `file` if given
pub fn load(file: Option<&Path>) -> Result<Config> {
    let defaults = Config::default();
    let mut builder = config::Config::builder()
        .set_default("data_dir", defaults.data_dir.to_string_lossy().into_owned())?
        .set_default("log_level", defaults.log_level)?
        .set_default("color", defaults.color)?;

    if let Some(path) = file {
        builder = builder.add_source(
            config::File::from(path.to_path_buf())
                .format(config::FileFormat::Toml)
                .required(true),
        );
    }

    builder
        .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()
        .context("Failed to assemble configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

/// Render a configuration as TOML
pub fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "data_dir = \"/srv/cabletrace\"\nlog_level = \"debug\"").unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/cabletrace"));
        assert_eq!(config.log_level, "debug");
        assert!(config.color);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load(Some(Path::new("/nonexistent/cabletrace.toml"))).is_err());
    }

    #[test]
    fn test_toml_rendering() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/x"),
            log_level: "info".into(),
            color: false,
        };
        let rendered = to_toml(&config).unwrap();
        assert!(rendered.contains("log_level = \"info\""));
        assert!(rendered.contains("color = false"));
    }
}
