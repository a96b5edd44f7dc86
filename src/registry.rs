// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Termination registry - uniform access to every cable-capable endpoint
//!
//! Terminations are registered by the record layer with a [`PortRole`] that
//! carries the per-kind data the tracer needs (rear port position counts,
//! front port mappings, connectability). [`resolve`] turns a
//! [`TerminationRef`] into a [`TerminationHandle`], a closed enum over the
//! three behaviours a termination can have on a path.

use crate::cable::CableStore;
use crate::error::{Result, TopologyError};
use crate::types::{Cable, TerminationId, TerminationKind, TerminationRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Per-kind data attached to a registered termination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum PortRole {
    /// A cable-capable endpoint with no pass-through behaviour
    Endpoint,
    /// A virtual interface (LAG, bridge, ...); cannot be cabled
    VirtualInterface,
    /// A circuit termination attached to a provider network; cannot be cabled
    ProviderNetwork {
        /// Provider network name
        provider_network: String,
    },
    /// Rear port of a pass-through panel
    RearPort {
        /// Number of front port positions it carries
        positions: u16,
    },
    /// Front port of a pass-through panel
    FrontPort {
        /// Rear port this front port is wired to
        rear_port: Option<TerminationId>,
        /// Position on the rear port
        rear_port_position: u16,
    },
}

/// A registered termination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationRecord {
    /// Reference (kind + id)
    pub reference: TerminationRef,
    /// Display name
    pub name: String,
    /// Owning device or circuit, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Per-kind data
    pub role: PortRole,
}

impl TerminationRecord {
    /// A plain endpoint (console/power port, interface, power feed, circuit termination)
    #[must_use]
    pub fn endpoint(reference: TerminationRef, name: impl Into<String>) -> Self {
        Self {
            reference,
            name: name.into(),
            parent: None,
            role: PortRole::Endpoint,
        }
    }

    /// A rear port with the given number of positions
    #[must_use]
    pub fn rear_port(id: TerminationId, name: impl Into<String>, positions: u16) -> Self {
        Self {
            reference: TerminationRef::rear_port(id),
            name: name.into(),
            parent: None,
            role: PortRole::RearPort { positions },
        }
    }

    /// A front port mapped to a rear port position
    #[must_use]
    pub fn front_port(
        id: TerminationId,
        name: impl Into<String>,
        rear_port: TerminationId,
        rear_port_position: u16,
    ) -> Self {
        Self {
            reference: TerminationRef::front_port(id),
            name: name.into(),
            parent: None,
            role: PortRole::FrontPort {
                rear_port: Some(rear_port),
                rear_port_position,
            },
        }
    }

    /// Set the owning device or circuit
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Why this termination cannot take a cable, if it cannot
    #[must_use]
    pub fn not_cable_capable(&self) -> Option<String> {
        match &self.role {
            PortRole::VirtualInterface => {
                Some(format!("cables cannot be terminated to virtual interface {}", self.reference))
            }
            PortRole::ProviderNetwork { provider_network } => Some(format!(
                "circuit termination {} is attached to provider network '{provider_network}' and may not be cabled",
                self.reference
            )),
            _ => None,
        }
    }

    fn check_role(&self) -> Result<()> {
        let kind = self.reference.kind;
        let ok = match &self.role {
            PortRole::Endpoint => !kind.is_pass_through(),
            PortRole::VirtualInterface => kind == TerminationKind::Interface,
            PortRole::ProviderNetwork { .. } => kind == TerminationKind::CircuitTermination,
            PortRole::RearPort { positions } => {
                if *positions == 0 {
                    return Err(TopologyError::InvalidPort(format!(
                        "{} must have at least one position",
                        self.reference
                    )));
                }
                kind == TerminationKind::RearPort
            }
            PortRole::FrontPort { .. } => kind == TerminationKind::FrontPort,
        };
        if ok {
            Ok(())
        } else {
            Err(TopologyError::InvalidPort(format!(
                "{} cannot have role {:?}",
                self.reference, self.role
            )))
        }
    }
}

/// Registry of every known termination
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<TerminationRecord>", into = "Vec<TerminationRecord>")]
pub struct Registry {
    records: BTreeMap<TerminationRef, TerminationRecord>,
    /// rear port id -> position -> front port id
    fronts_by_rear: HashMap<TerminationId, BTreeMap<u16, TerminationId>>,
}

impl From<Vec<TerminationRecord>> for Registry {
    fn from(records: Vec<TerminationRecord>) -> Self {
        let mut registry = Self::default();
        for record in records {
            registry.index(&record);
            registry.records.insert(record.reference, record);
        }
        registry
    }
}

impl From<Registry> for Vec<TerminationRecord> {
    fn from(registry: Registry) -> Self {
        registry.records.into_values().collect()
    }
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&mut self, record: &TerminationRecord) {
        if let PortRole::FrontPort {
            rear_port: Some(rear),
            rear_port_position,
        } = record.role
        {
            self.fronts_by_rear
                .entry(rear)
                .or_default()
                .insert(rear_port_position, record.reference.id);
        }
    }

    fn unindex(&mut self, record: &TerminationRecord) {
        if let PortRole::FrontPort {
            rear_port: Some(rear),
            rear_port_position,
        } = record.role
        {
            if let Some(fronts) = self.fronts_by_rear.get_mut(&rear) {
                if fronts.get(&rear_port_position) == Some(&record.reference.id) {
                    fronts.remove(&rear_port_position);
                }
            }
        }
    }

    /// Register a termination
    ///
    /// Front ports must name an existing rear port and an unclaimed position
    /// within its range.
    pub fn insert(&mut self, record: TerminationRecord) -> Result<()> {
        if self.records.contains_key(&record.reference) {
            return Err(TopologyError::TerminationExists(record.reference));
        }
        record.check_role()?;

        if let PortRole::FrontPort {
            rear_port,
            rear_port_position,
        } = record.role
        {
            let rear = rear_port.ok_or(TopologyError::UnmappedPassThrough(record.reference))?;
            let positions = self.positions(rear)?;
            if rear_port_position == 0 || rear_port_position > positions {
                return Err(TopologyError::InvalidPort(format!(
                    "invalid rear port position ({rear_port_position}): rear-port:{rear} has only {positions} position(s)"
                )));
            }
            if let Some(existing) = self.front_at(rear, rear_port_position) {
                return Err(TopologyError::PositionConflict {
                    rear_port: rear,
                    position: rear_port_position,
                    claimed_by: existing,
                });
            }
        }

        self.index(&record);
        self.records.insert(record.reference, record);
        Ok(())
    }

    /// Remove a termination, returning its record
    ///
    /// Front ports mapped to a removed rear port keep existing but become
    /// unmapped.
    pub fn remove(&mut self, reference: TerminationRef) -> Result<TerminationRecord> {
        let record = self
            .records
            .remove(&reference)
            .ok_or(TopologyError::TerminationNotFound(reference))?;

        match record.role {
            PortRole::RearPort { .. } => {
                if let Some(fronts) = self.fronts_by_rear.remove(&reference.id) {
                    for front in fronts.into_values() {
                        if let Some(PortRole::FrontPort { rear_port, .. }) = self
                            .records
                            .get_mut(&TerminationRef::front_port(front))
                            .map(|r| &mut r.role)
                        {
                            *rear_port = None;
                        }
                    }
                }
            }
            PortRole::FrontPort {
                rear_port: Some(rear),
                rear_port_position,
            } => {
                if let Some(fronts) = self.fronts_by_rear.get_mut(&rear) {
                    fronts.remove(&rear_port_position);
                }
            }
            _ => {}
        }

        Ok(record)
    }

    /// Change the number of positions a rear port carries
    pub fn set_positions(&mut self, rear: TerminationId, positions: u16) -> Result<()> {
        if positions == 0 {
            return Err(TopologyError::InvalidPort(format!(
                "rear-port:{rear} must have at least one position"
            )));
        }
        if let Some((&position, &front)) = self
            .fronts_by_rear
            .get(&rear)
            .and_then(|fronts| fronts.range(positions.saturating_add(1)..).next())
        {
            return Err(TopologyError::PositionsInUse {
                rear_port: rear,
                requested: positions,
                front_port: TerminationRef::front_port(front),
                position,
            });
        }
        match self
            .records
            .get_mut(&TerminationRef::rear_port(rear))
            .map(|r| &mut r.role)
        {
            Some(PortRole::RearPort { positions: current }) => {
                *current = positions;
                Ok(())
            }
            _ => Err(TopologyError::TerminationNotFound(TerminationRef::rear_port(rear))),
        }
    }

    /// Put a record back as it was, or drop it when `record` is `None`
    ///
    /// Used to roll back a failed transaction; no validation is done.
    pub(crate) fn restore(&mut self, reference: TerminationRef, record: Option<TerminationRecord>) {
        if let Some(current) = self.records.remove(&reference) {
            self.unindex(&current);
        }
        if let Some(record) = record {
            self.index(&record);
            self.records.insert(reference, record);
        }
    }

    /// Look up a termination
    #[must_use]
    pub fn get(&self, reference: &TerminationRef) -> Option<&TerminationRecord> {
        self.records.get(reference)
    }

    /// Look up a termination or fail with `TerminationNotFound`
    pub fn require(&self, reference: &TerminationRef) -> Result<&TerminationRecord> {
        self.get(reference)
            .ok_or(TopologyError::TerminationNotFound(*reference))
    }

    /// Whether the termination is registered
    #[must_use]
    pub fn contains(&self, reference: &TerminationRef) -> bool {
        self.records.contains_key(reference)
    }

    /// Position count of a rear port
    pub fn positions(&self, rear: TerminationId) -> Result<u16> {
        let reference = TerminationRef::rear_port(rear);
        match self.require(&reference)?.role {
            PortRole::RearPort { positions } => Ok(positions),
            _ => Err(TopologyError::TerminationNotFound(reference)),
        }
    }

    /// Front port mapped to a given rear port position
    #[must_use]
    pub fn front_at(&self, rear: TerminationId, position: u16) -> Option<TerminationRef> {
        self.fronts_by_rear
            .get(&rear)
            .and_then(|fronts| fronts.get(&position))
            .map(|&id| TerminationRef::front_port(id))
    }

    /// Front ports mapped to a rear port, ordered by position
    pub fn fronts_of(&self, rear: TerminationId) -> impl Iterator<Item = (TerminationRef, u16)> + '_ {
        self.fronts_by_rear
            .get(&rear)
            .into_iter()
            .flat_map(|fronts| fronts.iter())
            .map(|(&position, &id)| (TerminationRef::front_port(id), position))
    }

    /// All records, ordered by reference
    pub fn iter(&self) -> impl Iterator<Item = &TerminationRecord> {
        self.records.values()
    }

    /// Number of registered terminations
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// =============================================================================
// Handles
// =============================================================================

/// Capabilities every termination exposes to the tracer
pub trait Connectable {
    /// The termination's reference
    fn reference(&self) -> TerminationRef;

    /// The cable attached to this termination, if any
    fn get_cable(&self) -> Option<&Cable>;

    /// Whether the termination relays paths to fixed peers
    fn is_pass_through(&self) -> bool;

    /// Peers reachable over internal wiring, ordered by position
    fn get_pass_through_peers(&self) -> Vec<TerminationRef>;
}

/// Handle on a non-pass-through termination
#[derive(Debug, Clone, Copy)]
pub struct EndpointHandle<'a> {
    record: &'a TerminationRecord,
    cables: &'a CableStore,
}

/// Handle on a front port
#[derive(Debug, Clone, Copy)]
pub struct FrontPortHandle<'a> {
    record: &'a TerminationRecord,
    cables: &'a CableStore,
}

/// Handle on a rear port
#[derive(Debug, Clone, Copy)]
pub struct RearPortHandle<'a> {
    record: &'a TerminationRecord,
    registry: &'a Registry,
    cables: &'a CableStore,
}

impl Connectable for EndpointHandle<'_> {
    fn reference(&self) -> TerminationRef {
        self.record.reference
    }

    fn get_cable(&self) -> Option<&Cable> {
        self.cables.find_by_termination(&self.record.reference)
    }

    fn is_pass_through(&self) -> bool {
        false
    }

    fn get_pass_through_peers(&self) -> Vec<TerminationRef> {
        Vec::new()
    }
}

impl FrontPortHandle<'_> {
    /// The rear port and position this front port maps to, if configured
    #[must_use]
    pub fn rear_port(&self) -> Option<(TerminationRef, u16)> {
        match self.record.role {
            PortRole::FrontPort {
                rear_port: Some(rear),
                rear_port_position,
            } => Some((TerminationRef::rear_port(rear), rear_port_position)),
            _ => None,
        }
    }
}

impl Connectable for FrontPortHandle<'_> {
    fn reference(&self) -> TerminationRef {
        self.record.reference
    }

    fn get_cable(&self) -> Option<&Cable> {
        self.cables.find_by_termination(&self.record.reference)
    }

    fn is_pass_through(&self) -> bool {
        true
    }

    fn get_pass_through_peers(&self) -> Vec<TerminationRef> {
        self.rear_port().map(|(rear, _)| rear).into_iter().collect()
    }
}

impl RearPortHandle<'_> {
    /// Number of positions this rear port carries
    #[must_use]
    pub fn positions(&self) -> u16 {
        match self.record.role {
            PortRole::RearPort { positions } => positions,
            _ => 0,
        }
    }
}

impl Connectable for RearPortHandle<'_> {
    fn reference(&self) -> TerminationRef {
        self.record.reference
    }

    fn get_cable(&self) -> Option<&Cable> {
        self.cables.find_by_termination(&self.record.reference)
    }

    fn is_pass_through(&self) -> bool {
        true
    }

    fn get_pass_through_peers(&self) -> Vec<TerminationRef> {
        self.registry
            .fronts_of(self.record.reference.id)
            .map(|(front, _)| front)
            .collect()
    }
}

/// A resolved termination
#[derive(Debug, Clone, Copy)]
pub enum TerminationHandle<'a> {
    /// Anything that ends a path
    Endpoint(EndpointHandle<'a>),
    /// Front port of a pass-through panel
    FrontPort(FrontPortHandle<'a>),
    /// Rear port of a pass-through panel
    RearPort(RearPortHandle<'a>),
}

impl TerminationHandle<'_> {
    fn inner(&self) -> &dyn Connectable {
        match self {
            Self::Endpoint(h) => h,
            Self::FrontPort(h) => h,
            Self::RearPort(h) => h,
        }
    }
}

impl Connectable for TerminationHandle<'_> {
    fn reference(&self) -> TerminationRef {
        self.inner().reference()
    }

    fn get_cable(&self) -> Option<&Cable> {
        self.inner().get_cable()
    }

    fn is_pass_through(&self) -> bool {
        self.inner().is_pass_through()
    }

    fn get_pass_through_peers(&self) -> Vec<TerminationRef> {
        self.inner().get_pass_through_peers()
    }
}

/// Resolve a reference into a handle
pub fn resolve<'a>(
    registry: &'a Registry,
    cables: &'a CableStore,
    reference: TerminationRef,
) -> Result<TerminationHandle<'a>> {
    let record = registry.require(&reference)?;
    Ok(match reference.kind {
        TerminationKind::FrontPort => TerminationHandle::FrontPort(FrontPortHandle { record, cables }),
        TerminationKind::RearPort => TerminationHandle::RearPort(RearPortHandle {
            record,
            registry,
            cables,
        }),
        _ => TerminationHandle::Endpoint(EndpointHandle { record, cables }),
    })
}
