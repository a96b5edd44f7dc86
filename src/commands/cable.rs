// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Cable management commands - connect, rewire and remove cables

use super::{open_db, parse_refs, Output};
use crate::config::Config;
use crate::types::{Cable, CableAttrs, CableId, CableStatus, LengthUnit};
use anyhow::{Context, Result};

/// Arguments for cable commands
#[derive(Debug, Clone, Default)]
pub struct CableArgs {
    /// A-side termination references
    pub a_side: Vec<String>,
    /// B-side termination references
    pub b_side: Vec<String>,
    /// Cable status
    pub status: Option<String>,
    /// Cable type
    pub cable_type: Option<String>,
    /// Label
    pub label: Option<String>,
    /// Color (six hex digits)
    pub color: Option<String>,
    /// Length
    pub length: Option<f64>,
    /// Length unit
    pub unit: Option<String>,
    /// Drop the recorded length and its unit
    pub clear_length: bool,
}

impl CableArgs {
    fn has_attrs(&self) -> bool {
        self.cable_type.is_some()
            || self.label.is_some()
            || self.color.is_some()
            || self.length.is_some()
            || self.unit.is_some()
            || self.clear_length
    }

    /// Overlay the given attributes onto `base`
    ///
    /// An empty string clears that attribute.
    fn attrs(&self, base: CableAttrs) -> crate::error::Result<CableAttrs> {
        if self.clear_length {
            return Ok(CableAttrs {
                length: None,
                length_unit: None,
                ..self.text_attrs(base)
            });
        }
        let length_unit = match self.unit.as_deref() {
            Some("") => None,
            Some(unit) => Some(unit.parse::<LengthUnit>()?),
            None => base.length_unit,
        };
        Ok(CableAttrs {
            length: self.length.or(base.length),
            length_unit,
            ..self.text_attrs(base)
        })
    }

    fn text_attrs(&self, base: CableAttrs) -> CableAttrs {
        CableAttrs {
            cable_type: overlay(&self.cable_type, base.cable_type),
            label: overlay(&self.label, base.label),
            color: overlay(&self.color, base.color),
            ..base
        }
    }

    fn status(&self) -> crate::error::Result<Option<CableStatus>> {
        self.status.as_deref().map(str::parse).transpose()
    }
}

/// Run cable command
pub fn run(config: &Config, out: Output, action: &str, id: Option<CableId>, args: CableArgs) -> Result<()> {
    let db = open_db(config)?;
    let require_id = || id.ok_or_else(|| anyhow::anyhow!("Cable id is required"));

    match action {
        "add" | "create" | "connect" => {
            let a_side = parse_refs(&args.a_side)?;
            let b_side = parse_refs(&args.b_side)?;
            let status = args.status()?.unwrap_or_default();
            let attrs = args.attrs(CableAttrs::default())?;
            let cable = db
                .transaction(|t| t.create_cable(a_side, b_side, status, attrs))
                .context("Failed to create cable")?;
            if out.json {
                return out.print_json(&cable);
            }
            println!("Created cable {}", cable.display_name());
            print_cable(&cable);
        }

        "status" => {
            let id = require_id()?;
            let status = args
                .status()?
                .ok_or_else(|| anyhow::anyhow!("--status is required (connected, planned, decommissioning)"))?;
            db.transaction(|t| t.update_cable_status(id, status))?;
            println!("Cable #{id} is now {status}");
        }

        "update" | "edit" => {
            let id = require_id()?;
            if !args.has_attrs() && args.status.is_none() {
                anyhow::bail!(
                    "Nothing to update. Use --status, --type, --label, --color, --length, --unit or --clear-length"
                );
            }
            let status = args.status()?;
            db.transaction(|t| {
                if args.has_attrs() {
                    let current = t.cables().require(id)?.attrs.clone();
                    t.update_cable_attrs(id, args.attrs(current)?)?;
                }
                if let Some(status) = status {
                    t.update_cable_status(id, status)?;
                }
                Ok(())
            })?;
            println!("Updated cable #{id}");
        }

        "swap" => {
            let id = require_id()?;
            db.transaction(|t| t.swap_cable_sides(id))?;
            println!("Swapped the ends of cable #{id}");
        }

        "remove" | "delete" | "rm" => {
            let id = require_id()?;
            let cable = db.transaction(|t| t.delete_cable(id))?;
            println!("Deleted cable {}", cable.display_name());
        }

        "show" => {
            let id = require_id()?;
            let cable = db.read(|t| t.cables().require(id).cloned())??;
            if out.json {
                return out.print_json(&cable);
            }
            print_cable(&cable);
        }

        "list" | "ls" => {
            let cables: Vec<Cable> = db.read(|t| t.cables().iter().cloned().collect())?;
            if out.json {
                return out.print_json(&cables);
            }
            if cables.is_empty() {
                println!("No cables defined. Use 'cabletrace cable add' to create one.");
                return Ok(());
            }
            println!("Cables ({}):", cables.len());
            for cable in &cables {
                println!(
                    "  {:<10} {} <-> {}  [{}]",
                    cable.display_name(),
                    join(&cable.a_terminations),
                    join(&cable.b_terminations),
                    cable.status
                );
            }
        }

        other => {
            anyhow::bail!("Unknown action: {}. Valid: add, status, update, swap, rm, show, list", other);
        }
    }

    Ok(())
}

fn overlay(arg: &Option<String>, base: Option<String>) -> Option<String> {
    match arg.as_deref() {
        Some("") => None,
        Some(value) => Some(value.to_string()),
        None => base,
    }
}

fn print_cable(cable: &Cable) {
    println!("  id:      {}", cable.id);
    println!("  a-side:  {}", join(&cable.a_terminations));
    println!("  b-side:  {}", join(&cable.b_terminations));
    println!("  status:  {}", cable.status);
    if let Some(kind) = &cable.attrs.cable_type {
        println!("  type:    {kind}");
    }
    if let Some(color) = &cable.attrs.color {
        println!("  color:   #{color}");
    }
    if let (Some(length), Some(unit)) = (cable.attrs.length, cable.attrs.length_unit) {
        println!("  length:  {length} {}", unit.code());
    }
    println!("  updated: {}", cable.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
}

fn join(terms: &[crate::types::TerminationRef]) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
