// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Port management commands - register and remove terminations

use super::{open_db, parse_ref, Output};
use crate::config::Config;
use crate::registry::{PortRole, TerminationRecord};
use crate::types::{TerminationKind, TerminationRef};
use anyhow::{Context, Result};

/// Arguments for port commands
#[derive(Debug, Clone, Default)]
pub struct PortArgs {
    /// Display name
    pub name: Option<String>,
    /// Owning device or circuit
    pub parent: Option<String>,
    /// Positions of a rear port
    pub positions: Option<u16>,
    /// Rear port id a front port maps to
    pub rear: Option<u64>,
    /// Rear port position a front port maps to
    pub position: Option<u16>,
    /// Register a virtual (non-cable-capable) interface
    pub virtual_interface: bool,
    /// Provider network a circuit termination attaches to
    pub provider_network: Option<String>,
}

/// Run port command
pub fn run(config: &Config, out: Output, action: &str, reference: Option<String>, args: PortArgs) -> Result<()> {
    let db = open_db(config)?;

    match action {
        "add" | "create" => {
            let reference = parse_ref(&reference.ok_or_else(|| anyhow::anyhow!("Termination reference is required"))?)?;
            let record = build_record(reference, args)?;
            let name = record.name.clone();
            db.transaction(|t| t.add_termination(record))
                .with_context(|| format!("Failed to add {reference}"))?;
            println!("Added {} ({})", out.reference(&reference), name);
        }

        "remove" | "delete" | "rm" => {
            let reference = parse_ref(&reference.ok_or_else(|| anyhow::anyhow!("Termination reference is required"))?)?;
            let record = db.transaction(|t| t.remove_termination(reference))?;
            println!("Removed {} ({})", out.reference(&reference), record.name);
        }

        "positions" => {
            let reference = parse_ref(&reference.ok_or_else(|| anyhow::anyhow!("Rear port reference is required"))?)?;
            if reference.kind != TerminationKind::RearPort {
                anyhow::bail!("{} is not a rear port", reference);
            }
            let positions = args.positions.ok_or_else(|| anyhow::anyhow!("--positions is required"))?;
            db.transaction(|t| t.set_rear_positions(reference.id, positions))?;
            println!("{} now has {} position(s)", out.reference(&reference), positions);
        }

        "list" | "ls" => {
            let records: Vec<TerminationRecord> = db.read(|t| t.registry().iter().cloned().collect())?;
            if out.json {
                return out.print_json(&records);
            }
            if records.is_empty() {
                println!("No terminations registered. Use 'cabletrace port add' to create one.");
                return Ok(());
            }
            println!("Terminations ({}):", records.len());
            for record in &records {
                let parent = record.parent.as_deref().map(|p| format!(" on {p}")).unwrap_or_default();
                println!("  {:<28} {}{}{}", out.reference(&record.reference), record.name, parent, describe(&record.role));
            }
        }

        other => {
            anyhow::bail!("Unknown action: {}. Valid: add, rm, positions, list", other);
        }
    }

    Ok(())
}

fn build_record(reference: TerminationRef, args: PortArgs) -> Result<TerminationRecord> {
    let role = match reference.kind {
        TerminationKind::RearPort => PortRole::RearPort {
            positions: args.positions.unwrap_or(1),
        },
        TerminationKind::FrontPort => PortRole::FrontPort {
            rear_port: Some(args.rear.ok_or_else(|| anyhow::anyhow!("--rear is required for a front port"))?),
            rear_port_position: args.position.unwrap_or(1),
        },
        TerminationKind::Interface if args.virtual_interface => PortRole::VirtualInterface,
        TerminationKind::CircuitTermination if args.provider_network.is_some() => PortRole::ProviderNetwork {
            provider_network: args.provider_network.unwrap_or_default(),
        },
        _ => PortRole::Endpoint,
    };

    Ok(TerminationRecord {
        reference,
        name: args.name.unwrap_or_else(|| reference.to_string()),
        parent: args.parent,
        role,
    })
}

fn describe(role: &PortRole) -> String {
    match role {
        PortRole::Endpoint => String::new(),
        PortRole::VirtualInterface => " [virtual]".into(),
        PortRole::ProviderNetwork { provider_network } => format!(" [provider network {provider_network}]"),
        PortRole::RearPort { positions } => format!(" [{positions} position(s)]"),
        PortRole::FrontPort {
            rear_port: Some(rear),
            rear_port_position,
        } => format!(" [rear-port:{rear} pos {rear_port_position}]"),
        PortRole::FrontPort { rear_port: None, .. } => " [unmapped]".into(),
    }
}
