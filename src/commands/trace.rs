// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Trace command - show every branch of the path from a termination

use super::{open_db, parse_ref, Output};
use crate::config::Config;
use crate::topology::Topology;
use crate::types::{Path, PathSegment, TerminationRef, Trace};
use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;

/// One branch as printed in JSON output
#[derive(Debug, Serialize)]
struct BranchReport<'a> {
    #[serde(flatten)]
    path: &'a Path,
    length_meters: f64,
    length_definitive: bool,
}

/// JSON output of the trace command
#[derive(Debug, Serialize)]
struct TraceReport<'a> {
    origin: String,
    status: String,
    is_connected: bool,
    branches: Vec<BranchReport<'a>>,
}

/// Run trace command
pub fn run(config: &Config, out: Output, reference: &str) -> Result<()> {
    let reference = parse_ref(reference)?;
    let db = open_db(config)?;
    let trace = db.trace(reference)?;
    let topology = db.snapshot()?;

    if out.json {
        let report = TraceReport {
            origin: trace.origin.to_string(),
            status: trace.status().to_string(),
            is_connected: trace.is_connected(),
            branches: trace
                .paths
                .iter()
                .map(|path| {
                    let (length_meters, length_definitive) = topology.path_length(path);
                    BranchReport {
                        path,
                        length_meters,
                        length_definitive,
                    }
                })
                .collect(),
        };
        return out.print_json(&report);
    }

    print!("{}", render(&topology, &trace, out));
    Ok(())
}

/// Human-readable rendering of a trace
#[must_use]
pub fn render(topology: &Topology, trace: &Trace, out: Output) -> String {
    let name = |t: &TerminationRef| {
        topology
            .registry()
            .get(t)
            .map_or_else(String::new, |r| format!(" ({})", r.name))
    };

    let mut lines = vec![format!(
        "Trace from {}{}: {}",
        out.reference(&trace.origin),
        name(&trace.origin),
        out.status(&trace.status())
    )];

    let total = trace.paths.len();
    for (i, path) in trace.paths.iter().enumerate() {
        let state = if path.is_active { "active" } else { "inactive" };
        let state = if out.color && path.is_active {
            state.green().to_string()
        } else if out.color {
            state.red().to_string()
        } else {
            state.to_string()
        };
        let (meters, definitive) = topology.path_length(path);
        let length = match (path.cable_count(), definitive) {
            (0, _) => String::new(),
            (_, true) => format!(", {meters:.2} m"),
            (_, false) if meters > 0.0 => format!(", at least {meters:.2} m"),
            (_, false) => String::new(),
        };
        lines.push(format!(
            "  Branch {}/{}: {} [{}] {} cable(s){}",
            i + 1,
            total,
            path.outcome,
            state,
            path.cable_count(),
            length
        ));
        for segment in &path.segments {
            let hop = match segment {
                PathSegment::Cable { cable } => {
                    let detail = topology
                        .cables()
                        .get(*cable)
                        .map_or_else(|| "missing".to_string(), |c| format!("{}, {}", c.display_name(), c.status));
                    format!("cable #{cable} ({detail})")
                }
                PathSegment::PassThrough { from, to } => format!("{from}{} => {to}{}", name(from), name(to)),
            };
            lines.push(format!("    {hop}"));
        }
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TerminationRecord;
    use crate::types::{CableAttrs, CableStatus};

    #[test]
    fn test_render_lists_each_hop() {
        let mut topo = Topology::new();
        for id in [1, 2] {
            topo.add_termination(TerminationRecord::endpoint(TerminationRef::interface(id), format!("eth{id}")))
                .unwrap();
        }
        topo.create_cable(
            [TerminationRef::interface(1)],
            [TerminationRef::interface(2)],
            CableStatus::Planned,
            CableAttrs::default(),
        )
        .unwrap();
        let trace = topo.trace(TerminationRef::interface(1)).unwrap();

        let text = render(&topo, &trace, Output::default());
        assert!(text.starts_with("Trace from interface:1 (eth1): incomplete"));
        assert!(text.contains("Branch 1/1: reaches interface:2 [inactive] 1 cable(s)"));
        assert!(text.contains("cable #1 (#1, planned)"));
    }
}
