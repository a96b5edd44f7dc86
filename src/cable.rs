// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Cable store - physical links between terminations
//!
//! The store enforces the structural cable invariants: both ends non-empty
//! and disjoint, every termination registered and cable-capable, and no
//! termination on more than one cable. It knows nothing about paths; the
//! [`Topology`](crate::topology::Topology) wraps every mutation here with
//! path invalidation.

use crate::error::{Result, TopologyError};
use crate::registry::{PortRole, Registry};
use crate::types::{Cable, CableAttrs, CableEnd, CableId, CableStatus, TerminationRef};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Serialized form of the cable store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CableRows {
    next_id: CableId,
    cables: Vec<Cable>,
}

/// Outcome of removing a termination from its cable
#[derive(Debug, Clone, PartialEq)]
pub enum Detached {
    /// The termination was removed from one end; the cable survives
    Shrunk(CableId),
    /// The termination was the last one on its end; the cable is gone
    Removed(Cable),
}

/// All cables, indexed by id and by termination
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "CableRows", into = "CableRows")]
pub struct CableStore {
    cables: BTreeMap<CableId, Cable>,
    next_id: CableId,
    by_termination: HashMap<TerminationRef, CableId>,
}

impl TryFrom<CableRows> for CableStore {
    type Error = TopologyError;

    fn try_from(rows: CableRows) -> Result<Self> {
        let mut store = Self {
            next_id: rows.next_id,
            ..Self::default()
        };
        for cable in rows.cables {
            let after = successor(cable.id)?;
            store.next_id = store.next_id.max(after);
            for t in cable.terminations() {
                store.by_termination.insert(*t, cable.id);
            }
            store.cables.insert(cable.id, cable);
        }
        Ok(store)
    }
}

impl From<CableStore> for CableRows {
    fn from(store: CableStore) -> Self {
        Self {
            next_id: store.next_id,
            cables: store.cables.into_values().collect(),
        }
    }
}

impl CableStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Validate and insert a new cable
    ///
    /// Nothing is mutated unless every check passes.
    pub fn create(
        &mut self,
        registry: &Registry,
        side_a: impl IntoIterator<Item = TerminationRef>,
        side_b: impl IntoIterator<Item = TerminationRef>,
        status: CableStatus,
        attrs: CableAttrs,
    ) -> Result<Cable> {
        let side_a: BTreeSet<_> = side_a.into_iter().collect();
        let side_b: BTreeSet<_> = side_b.into_iter().collect();

        self.validate_sides(registry, &side_a, &side_b)?;
        attrs.validate()?;

        let id = self.next_id.max(1);
        self.next_id = successor(id)?;
        let now = Utc::now();
        let cable = Cable {
            id,
            a_terminations: side_a.into_iter().collect(),
            b_terminations: side_b.into_iter().collect(),
            status,
            attrs,
            created_at: now,
            updated_at: now,
        };
        for t in cable.terminations() {
            self.by_termination.insert(*t, id);
        }
        self.cables.insert(id, cable.clone());
        tracing::debug!("Stored cable #{} ({} <-> {})", id, join(&cable.a_terminations), join(&cable.b_terminations));
        Ok(cable)
    }

    fn validate_sides(
        &self,
        registry: &Registry,
        side_a: &BTreeSet<TerminationRef>,
        side_b: &BTreeSet<TerminationRef>,
    ) -> Result<()> {
        if side_a.is_empty() || side_b.is_empty() {
            return Err(TopologyError::InvalidTermination(
                "a cable needs at least one termination on each end".into(),
            ));
        }
        if let Some(shared) = side_a.intersection(side_b).next() {
            return Err(TopologyError::InvalidTermination(format!(
                "{shared} cannot be on both ends of the same cable"
            )));
        }

        for t in side_a.iter().chain(side_b.iter()) {
            let record = registry.require(t)?;
            if let Some(reason) = record.not_cable_capable() {
                return Err(TopologyError::InvalidTermination(reason));
            }
            if let Some(&cable) = self.by_termination.get(t) {
                return Err(TopologyError::DuplicateTermination {
                    termination: *t,
                    cable,
                });
            }
        }

        // A front port cannot be cabled straight to its own rear port
        for (near, far) in [(side_a, side_b), (side_b, side_a)] {
            for t in near {
                if let Some(PortRole::FrontPort {
                    rear_port: Some(rear),
                    ..
                }) = registry.get(t).map(|r| &r.role)
                {
                    if far.contains(&TerminationRef::rear_port(*rear)) {
                        return Err(TopologyError::InvalidTermination(format!(
                            "front port {t} cannot be connected to its own rear port"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Look up a cable
    #[must_use]
    pub fn get(&self, id: CableId) -> Option<&Cable> {
        self.cables.get(&id)
    }

    /// Look up a cable or fail with `CableNotFound`
    pub fn require(&self, id: CableId) -> Result<&Cable> {
        self.get(id).ok_or(TopologyError::CableNotFound(id))
    }

    /// The cable attached to a termination, if any
    #[must_use]
    pub fn find_by_termination(&self, termination: &TerminationRef) -> Option<&Cable> {
        self.by_termination
            .get(termination)
            .and_then(|id| self.cables.get(id))
    }

    /// Change a cable's status, returning the previous one
    pub fn update_status(&mut self, id: CableId, status: CableStatus) -> Result<CableStatus> {
        let cable = self
            .cables
            .get_mut(&id)
            .ok_or(TopologyError::CableNotFound(id))?;
        let previous = cable.status;
        if previous != status {
            cable.status = status;
            cable.updated_at = Utc::now();
        }
        Ok(previous)
    }

    /// Replace a cable's physical attributes
    pub fn update_attrs(&mut self, id: CableId, attrs: CableAttrs) -> Result<()> {
        attrs.validate()?;
        let cable = self
            .cables
            .get_mut(&id)
            .ok_or(TopologyError::CableNotFound(id))?;
        cable.attrs = attrs;
        cable.updated_at = Utc::now();
        Ok(())
    }

    /// Exchange the A and B ends of a cable
    ///
    /// Both ends are replaced in one step, so the one-cable-per-termination
    /// index never sees an intermediate state.
    pub fn swap_sides(&mut self, id: CableId) -> Result<()> {
        let cable = self
            .cables
            .get_mut(&id)
            .ok_or(TopologyError::CableNotFound(id))?;
        std::mem::swap(&mut cable.a_terminations, &mut cable.b_terminations);
        cable.updated_at = Utc::now();
        Ok(())
    }

    /// Id the next created cable will get
    #[must_use]
    pub fn next_id(&self) -> CableId {
        self.next_id
    }

    /// Put a cable back as it was, or drop it when `cable` is `None`
    ///
    /// Used to roll back a failed transaction; no validation is done.
    pub(crate) fn restore(&mut self, id: CableId, cable: Option<Cable>) {
        if let Some(current) = self.cables.remove(&id) {
            for t in current.terminations() {
                if self.by_termination.get(t) == Some(&id) {
                    self.by_termination.remove(t);
                }
            }
        }
        if let Some(cable) = cable {
            for t in cable.terminations() {
                self.by_termination.insert(*t, id);
            }
            self.cables.insert(id, cable);
        }
    }

    pub(crate) fn restore_next_id(&mut self, next_id: CableId) {
        self.next_id = next_id;
    }

    /// Remove a cable, freeing its terminations
    pub fn delete(&mut self, id: CableId) -> Result<Cable> {
        let cable = self
            .cables
            .remove(&id)
            .ok_or(TopologyError::CableNotFound(id))?;
        for t in cable.terminations() {
            self.by_termination.remove(t);
        }
        Ok(cable)
    }

    /// Drop a termination from whatever cable holds it
    ///
    /// When that leaves an end empty the whole cable is removed.
    pub fn detach_termination(&mut self, termination: &TerminationRef) -> Option<Detached> {
        let id = self.by_termination.remove(termination)?;
        let cable = self.cables.get_mut(&id)?;
        let end = cable.end_of(termination)?;
        let side = match end {
            CableEnd::A => &mut cable.a_terminations,
            CableEnd::B => &mut cable.b_terminations,
        };
        side.retain(|t| t != termination);
        if side.is_empty() {
            let cable = self.cables.remove(&id)?;
            for t in cable.terminations() {
                self.by_termination.remove(t);
            }
            Some(Detached::Removed(cable))
        } else {
            cable.updated_at = Utc::now();
            Some(Detached::Shrunk(id))
        }
    }

    /// All cables, ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &Cable> {
        self.cables.values()
    }

    /// Number of cables
    #[must_use]
    pub fn len(&self) -> usize {
        self.cables.len()
    }

    /// Whether there are no cables
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cables.is_empty()
    }
}

fn successor(id: CableId) -> Result<CableId> {
    id.checked_add(1)
        .ok_or_else(|| TopologyError::InvalidCable(format!("cable id {id} leaves no id for another cable")))
}

fn join(terms: &[TerminationRef]) -> String {
    terms
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
