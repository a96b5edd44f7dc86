// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Component command - everything physically linked to a termination

use super::{open_db, parse_ref, Output};
use crate::config::Config;
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ComponentReport {
    termination: String,
    terminations: Vec<String>,
    cables: Vec<u64>,
    components_total: usize,
}

/// Run component command
pub fn run(config: &Config, out: Output, reference: &str) -> Result<()> {
    let reference = parse_ref(reference)?;
    let db = open_db(config)?;
    let (component, total) = db.read(|t| Ok::<_, crate::error::TopologyError>((t.component(reference)?, t.component_count())))??;

    if out.json {
        return out.print_json(&ComponentReport {
            termination: reference.to_string(),
            terminations: component.terminations().iter().map(ToString::to_string).collect(),
            cables: component.cables().into_iter().collect(),
            components_total: total,
        });
    }

    println!(
        "Component of {}: {} termination(s), {} cable(s) ({} component(s) in topology)",
        out.reference(&reference),
        component.node_count(),
        component.cables().len(),
        total
    );
    for t in component.terminations() {
        println!("  {}", out.reference(&t));
    }
    Ok(())
}
