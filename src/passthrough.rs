// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Pass-through mapping between rear ports and front ports
//!
//! The mapping itself is owned by the registry (it is set when ports are
//! registered); this module reads it and decides where a trace goes next
//! when it crosses a patch panel.

use crate::error::{Result, TopologyError};
use crate::registry::{PortRole, Registry};
use crate::types::{TerminationKind, TerminationRef};

/// Rear port and position a front port is wired to
pub fn map_front_to_rear(registry: &Registry, front: TerminationRef) -> Result<(TerminationRef, u16)> {
    match registry.require(&front)?.role {
        PortRole::FrontPort {
            rear_port: Some(rear),
            rear_port_position,
        } => {
            let rear = TerminationRef::rear_port(rear);
            if !registry.contains(&rear) {
                return Err(TopologyError::UnmappedPassThrough(front));
            }
            Ok((rear, rear_port_position))
        }
        PortRole::FrontPort { rear_port: None, .. } => Err(TopologyError::UnmappedPassThrough(front)),
        _ => Err(TopologyError::InvalidTermination(format!("{front} is not a front port"))),
    }
}

/// Front ports wired to a rear port, ordered by position
pub fn map_rear_to_fronts(registry: &Registry, rear: TerminationRef) -> Result<Vec<(TerminationRef, u16)>> {
    match registry.require(&rear)?.role {
        PortRole::RearPort { .. } => Ok(registry.fronts_of(rear.id).collect()),
        _ => Err(TopologyError::InvalidTermination(format!("{rear} is not a rear port"))),
    }
}

/// One continuation of a branch across a pass-through port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hop {
    /// Port on the other side of the panel
    pub peer: TerminationRef,
    /// Position stack the branch carries onward
    pub positions: Vec<u16>,
}

/// Work out where a branch continues after arriving at `port` over a cable
///
/// Entering a front port of a multi-position rear port pushes that position,
/// so a later rear port on the far side of a trunk cable leads back out
/// through the matching front port instead of fanning out. A multi-position
/// rear port reached with an empty stack fans out to every mapped front port.
pub fn traverse(registry: &Registry, port: TerminationRef, stack: &[u16]) -> Result<Vec<Hop>> {
    match port.kind {
        TerminationKind::FrontPort => {
            let (rear, position) = map_front_to_rear(registry, port)?;
            let mut positions = stack.to_vec();
            if registry.positions(rear.id)? > 1 {
                positions.push(position);
            }
            Ok(vec![Hop { peer: rear, positions }])
        }
        TerminationKind::RearPort => {
            let total = registry.positions(port.id)?;
            if total == 1 {
                let front = registry
                    .front_at(port.id, 1)
                    .ok_or(TopologyError::UnmappedPassThrough(port))?;
                return Ok(vec![Hop {
                    peer: front,
                    positions: stack.to_vec(),
                }]);
            }

            if let Some((&position, rest)) = stack.split_last() {
                let front = registry
                    .front_at(port.id, position)
                    .ok_or(TopologyError::UnmappedPassThrough(port))?;
                return Ok(vec![Hop {
                    peer: front,
                    positions: rest.to_vec(),
                }]);
            }

            let hops: Vec<_> = map_rear_to_fronts(registry, port)?
                .into_iter()
                .map(|(front, _)| Hop {
                    peer: front,
                    positions: Vec::new(),
                })
                .collect();
            if hops.is_empty() {
                return Err(TopologyError::UnmappedPassThrough(port));
            }
            Ok(hops)
        }
        _ => Err(TopologyError::InvalidTermination(format!(
            "{port} is not a pass-through port"
        ))),
    }
}
