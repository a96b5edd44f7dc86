// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Config command - show the effective configuration

use crate::config::{self, Config};
use anyhow::Result;

/// Print the whole configuration as TOML, or a single key
pub fn run(config: &Config, key: Option<&str>) -> Result<()> {
    match key {
        None => print!("{}", config::to_toml(config)?),
        Some("data_dir" | "data-dir") => println!("{}", config.data_dir.display()),
        Some("log_level" | "log-level") => println!("{}", config.log_level),
        Some("color") => println!("{}", config.color),
        Some(other) => anyhow::bail!("Unknown config key: {}. Valid: data_dir, log_level, color", other),
    }
    Ok(())
}
