// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Command implementations

pub mod cable;
pub mod completions;
pub mod component;
pub mod config;
pub mod export;
pub mod port;
pub mod status;
pub mod trace;

use crate::config::Config;
use crate::database::TopologyDb;
use crate::types::{ConnectionStatus, TerminationRef};
use anyhow::{Context, Result};
use owo_colors::OwoColorize;

/// Presentation options shared by every command
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    /// Emit JSON instead of human-readable text
    pub json: bool,
    /// Use ANSI colors in human-readable text
    pub color: bool,
}

impl Output {
    /// Render a connection status, colored by severity
    #[must_use]
    pub fn status(&self, status: &ConnectionStatus) -> String {
        let text = status.to_string();
        if !self.color {
            return text;
        }
        match status {
            ConnectionStatus::Connected => text.green().to_string(),
            ConnectionStatus::NotConnected => text.dimmed().to_string(),
            ConnectionStatus::Incomplete(_) => text.yellow().to_string(),
        }
    }

    /// Render a termination reference in bold
    #[must_use]
    pub fn reference(&self, reference: &TerminationRef) -> String {
        if self.color {
            reference.bold().to_string()
        } else {
            reference.to_string()
        }
    }

    /// Print a value as pretty JSON
    pub fn print_json<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value).context("Failed to serialize output")?);
        Ok(())
    }
}

/// Open the topology database in the configured data directory
pub fn open_db(config: &Config) -> Result<TopologyDb> {
    TopologyDb::open(&config.data_dir)
        .with_context(|| format!("Failed to load topology from {}", config.data_dir.display()))
}

/// Parse a `kind:id` termination reference
pub fn parse_ref(s: &str) -> Result<TerminationRef> {
    s.parse::<TerminationRef>().map_err(anyhow::Error::from)
}

/// Parse a list of `kind:id` references
pub fn parse_refs(items: &[String]) -> Result<Vec<TerminationRef>> {
    items.iter().map(|s| parse_ref(s)).collect()
}
