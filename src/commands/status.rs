// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Status command - one-line connectivity summary per termination

use super::{open_db, parse_refs, Output};
use crate::config::Config;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StatusReport {
    termination: String,
    connected: bool,
    status: String,
    endpoints: Vec<String>,
}

/// Run status command
pub fn run(config: &Config, out: Output, references: &[String]) -> Result<()> {
    let references = parse_refs(references)?;
    if references.is_empty() {
        anyhow::bail!("At least one termination reference is required");
    }
    let db = open_db(config)?;

    let mut reports = Vec::with_capacity(references.len());
    for reference in references {
        let trace = db.trace(reference)?;
        let status = trace.status();
        if !out.json {
            let endpoints = trace.endpoints();
            let to = if endpoints.is_empty() {
                String::new()
            } else {
                format!(
                    " -> {}",
                    endpoints.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
                )
            };
            println!("{}: {}{}", out.reference(&reference), out.status(&status), to);
        }
        reports.push(StatusReport {
            termination: reference.to_string(),
            connected: trace.is_connected(),
            status: status.to_string(),
            endpoints: trace.endpoints().iter().map(ToString::to_string).collect(),
        });
    }

    if out.json {
        out.print_json(&reports)?;
    }
    Ok(())
}
