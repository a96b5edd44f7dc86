// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Export command - exports the topology to DOT or JSON

use super::{open_db, parse_ref};
use crate::config::Config;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// Supported export formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Graphviz DOT format
    Dot,
    /// JSON format (the persisted topology)
    Json,
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "dot" | "graphviz" => Ok(Self::Dot),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("Unknown export format: {}. Supported: dot, json", other),
        }
    }
}

/// Run the export command
pub fn run(config: &Config, format: &str, output: Option<PathBuf>, component: Option<String>) -> Result<()> {
    info!("Exporting to {}", format);
    let format: ExportFormat = format.parse()?;
    let component = component.as_deref().map(parse_ref).transpose()?;

    let db = open_db(config)?;
    let topology = db.snapshot()?;
    if topology.registry().is_empty() {
        eprintln!("Warning: topology is empty. Use 'cabletrace port add' first.");
    }

    let content = match (format, component) {
        (ExportFormat::Dot, Some(reference)) => topology.render_dot(&topology.component(reference)?),
        (ExportFormat::Dot, None) => topology.render_dot(&topology.graph()),
        (ExportFormat::Json, None) => {
            serde_json::to_string_pretty(&topology).context("Failed to serialize topology to JSON")?
        }
        (ExportFormat::Json, Some(_)) => anyhow::bail!("--component is only supported with --format dot"),
    };

    match output {
        Some(path) => {
            fs::write(&path, &content).with_context(|| format!("Failed to write to {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("DOT".parse::<ExportFormat>().unwrap(), ExportFormat::Dot);
        assert_eq!("json".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert!("yaml".parse::<ExportFormat>().is_err());
    }
}
