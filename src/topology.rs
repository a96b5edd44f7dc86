// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Topology - terminations, cables and stored paths kept consistent
//!
//! Every mutation goes through this type. Each one validates first, applies
//! the change to the registry or cable store, then retraces exactly the
//! origins whose stored paths could have changed, so connectivity queries
//! are correct as soon as the mutation returns.
//!
//! Between [`Topology::begin`] and [`Topology::commit`] every change is
//! journaled as its inverse, so [`Topology::rollback`] can restore the state
//! without the topology ever being copied.

use crate::cable::{CableStore, Detached};
use crate::error::Result;
use crate::paths::PathStore;
use crate::registry::{resolve, Connectable, PortRole, Registry, TerminationRecord};
use crate::trace::PathTracer;
use crate::types::{
    Cable, CableAttrs, CableId, CableStatus, ConnectionStatus, Path, PathId, TerminationId,
    TerminationKind, TerminationRef, Trace,
};
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::fmt::Write as _;

/// The whole physical topology and its resolved paths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Topology {
    #[serde(rename = "terminations")]
    registry: Registry,
    cables: CableStore,
    paths: PathStore,
    #[serde(skip)]
    journal: Option<Vec<Undo>>,
}

/// Inverse of one applied change
#[derive(Debug, Clone)]
enum Undo {
    Termination(TerminationRef, Option<TerminationRecord>),
    Cable(CableId, Option<Cable>),
    NextCableId(CableId),
    Origin(TerminationRef, Option<Vec<Path>>),
}

impl Topology {
    /// Create an empty topology
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            cables: CableStore::new(),
            paths: PathStore::new(),
            journal: None,
        }
    }

    /// Registered terminations
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Cables
    #[must_use]
    pub fn cables(&self) -> &CableStore {
        &self.cables
    }

    /// Stored paths
    #[must_use]
    pub fn paths(&self) -> &PathStore {
        &self.paths
    }

    // =========================================================================
    // Journal
    // =========================================================================

    /// Start journaling changes
    pub fn begin(&mut self) {
        self.journal = Some(Vec::new());
    }

    /// Whether anything changed since [`begin`](Self::begin)
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.journal.as_ref().is_some_and(|j| !j.is_empty())
    }

    /// Keep every change since [`begin`](Self::begin)
    pub fn commit(&mut self) {
        self.journal = None;
    }

    /// Undo every change since [`begin`](Self::begin), newest first
    pub fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        tracing::debug!("Rolling back {} change(s)", journal.len());
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Termination(reference, record) => self.registry.restore(reference, record),
                Undo::Cable(id, cable) => self.cables.restore(id, cable),
                Undo::NextCableId(next) => self.cables.restore_next_id(next),
                Undo::Origin(origin, branches) => {
                    self.paths.remove_origin(&origin);
                    if let Some(branches) = branches {
                        self.paths.replace(origin, branches);
                    }
                }
            }
        }
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = &mut self.journal {
            journal.push(undo);
        }
    }

    fn record_origin(&mut self, origin: TerminationRef) {
        if self.journal.is_some() {
            let previous = self.paths.get(&origin).map(|t| t.paths);
            self.record(Undo::Origin(origin, previous));
        }
    }

    // =========================================================================
    // Termination mutations
    // =========================================================================

    /// Register a termination
    ///
    /// A new front port changes where its rear port leads, so paths through
    /// that rear port are retraced.
    pub fn add_termination(&mut self, record: TerminationRecord) -> Result<()> {
        let reference = record.reference;
        let rear = match record.role {
            PortRole::FrontPort {
                rear_port: Some(rear), ..
            } => Some(TerminationRef::rear_port(rear)),
            _ => None,
        };
        self.registry.insert(record)?;
        self.record(Undo::Termination(reference, None));
        tracing::info!("Registered {}", reference);

        if let Some(rear) = rear {
            self.invalidate_for_termination(rear);
        }
        Ok(())
    }

    /// Change how many positions a rear port carries
    pub fn set_rear_positions(&mut self, rear: TerminationId, positions: u16) -> Result<()> {
        if self.registry.positions(rear)? == positions {
            return Ok(());
        }
        let previous = self.registry.get(&TerminationRef::rear_port(rear)).cloned();
        self.registry.set_positions(rear, positions)?;
        self.record(Undo::Termination(TerminationRef::rear_port(rear), previous));
        tracing::info!("rear-port:{} now has {} position(s)", rear, positions);
        self.invalidate_for_termination(TerminationRef::rear_port(rear));
        Ok(())
    }

    /// Delete a termination
    ///
    /// The termination is dropped from its cable (the cable goes too if that
    /// empties one end), front ports of a deleted rear port become unmapped,
    /// and every path that started at, crossed or ended at it is retraced.
    pub fn remove_termination(&mut self, reference: TerminationRef) -> Result<TerminationRecord> {
        self.registry.require(&reference)?;

        let mut affected = self.paths.origins_touching(&reference);
        if let Some(cable) = self.cables.find_by_termination(&reference).cloned() {
            affected.extend(self.paths.origins_through_cable(cable.id));
            self.record(Undo::Cable(cable.id, Some(cable)));
        }
        if reference.kind == TerminationKind::RearPort {
            let fronts: Vec<_> = self
                .registry
                .fronts_of(reference.id)
                .filter_map(|(front, _)| self.registry.get(&front).cloned())
                .collect();
            for front in fronts {
                self.record(Undo::Termination(front.reference, Some(front)));
            }
        }

        match self.cables.detach_termination(&reference) {
            Some(Detached::Removed(cable)) => {
                tracing::info!("Cable #{} removed along with its last {} termination", cable.id, reference);
            }
            Some(Detached::Shrunk(id)) => tracing::debug!("Detached {} from cable #{}", reference, id),
            None => {}
        }
        let record = self.registry.remove(reference)?;
        self.record(Undo::Termination(reference, Some(record.clone())));
        self.forget(reference);
        affected.remove(&reference);
        tracing::info!("Removed {}", reference);

        self.retrace_origins(&affected);
        Ok(record)
    }

    // =========================================================================
    // Cable mutations
    // =========================================================================

    /// Create a cable and trace every endpoint in the component it joins
    pub fn create_cable(
        &mut self,
        side_a: impl IntoIterator<Item = TerminationRef>,
        side_b: impl IntoIterator<Item = TerminationRef>,
        status: CableStatus,
        attrs: CableAttrs,
    ) -> Result<Cable> {
        let next_id = self.cables.next_id();
        let cable = self.cables.create(&self.registry, side_a, side_b, status, attrs)?;
        self.record(Undo::NextCableId(next_id));
        self.record(Undo::Cable(cable.id, None));
        tracing::info!("Created cable #{} ({})", cable.id, cable.status);
        self.refresh_component(cable.terminations().copied());
        Ok(cable)
    }

    /// Change a cable's status
    pub fn update_cable_status(&mut self, id: CableId, status: CableStatus) -> Result<()> {
        let before = self.cables.require(id)?.clone();
        let previous = self.cables.update_status(id, status)?;
        if previous != status {
            self.record(Undo::Cable(id, Some(before)));
            tracing::info!("Cable #{}: {} -> {}", id, previous, status);
            self.invalidate_for_cable(id);
        }
        Ok(())
    }

    /// Replace a cable's physical attributes
    pub fn update_cable_attrs(&mut self, id: CableId, attrs: CableAttrs) -> Result<()> {
        let before = self.cables.require(id)?.clone();
        if before.attrs == attrs {
            return Ok(());
        }
        self.cables.update_attrs(id, attrs)?;
        self.record(Undo::Cable(id, Some(before)));
        tracing::info!("Updated attributes of cable #{}", id);
        self.invalidate_for_cable(id);
        Ok(())
    }

    /// Exchange the A and B ends of a cable, retracing in the same step
    pub fn swap_cable_sides(&mut self, id: CableId) -> Result<()> {
        let before = self.cables.require(id)?.clone();
        self.cables.swap_sides(id)?;
        self.record(Undo::Cable(id, Some(before)));
        tracing::info!("Swapped ends of cable #{}", id);
        self.invalidate_for_cable(id);
        Ok(())
    }

    /// Delete a cable; no stored path refers to it afterwards
    pub fn delete_cable(&mut self, id: CableId) -> Result<Cable> {
        let affected = self.paths.origins_through_cable(id);
        let cable = self.cables.delete(id)?;
        self.record(Undo::Cable(id, Some(cable.clone())));
        tracing::info!("Deleted cable #{}", id);
        self.retrace_origins(&affected);
        Ok(cable)
    }

    // =========================================================================
    // Invalidation
    // =========================================================================

    /// Retrace every stored origin whose path crosses `cable`
    pub fn invalidate_for_cable(&mut self, cable: CableId) {
        let affected = self.paths.origins_through_cable(cable);
        self.retrace_origins(&affected);
    }

    /// Retrace every stored origin whose path starts at, crosses or ends at `termination`
    pub fn invalidate_for_termination(&mut self, termination: TerminationRef) {
        let affected = self.paths.origins_touching(&termination);
        self.retrace_origins(&affected);
    }

    /// Retrace the given origins, independently of one another
    ///
    /// Origins that no longer exist or no longer reach any cable are dropped
    /// from the path store.
    fn retrace_origins(&mut self, origins: &BTreeSet<TerminationRef>) {
        for &origin in origins {
            if !self.registry.contains(&origin) {
                self.forget(origin);
                continue;
            }
            match PathTracer::new(&self.registry, &self.cables).trace(origin) {
                Ok(branches) => {
                    tracing::debug!("Retraced {} ({} branch(es))", origin, branches.len());
                    self.store(origin, branches);
                }
                Err(err) => {
                    tracing::warn!("Could not retrace {}: {}", origin, err);
                    self.forget(origin);
                }
            }
        }
    }

    fn store(&mut self, origin: TerminationRef, branches: Vec<Path>) {
        if !is_storable(&branches) {
            self.forget(origin);
            return;
        }
        let unchanged = self.paths.get(&origin).is_some_and(|stored| {
            stored
                .paths
                .iter()
                .map(|p| (&p.id, p.is_active))
                .eq(branches.iter().map(|p| (&p.id, p.is_active)))
        });
        if !unchanged {
            self.record_origin(origin);
            self.paths.replace(origin, branches);
        }
    }

    fn forget(&mut self, origin: TerminationRef) {
        if self.paths.contains_origin(&origin) {
            self.record_origin(origin);
            self.paths.remove_origin(&origin);
        }
    }

    /// Retrace every cabled endpoint and stored origin in the component
    /// containing `seeds`
    fn refresh_component(&mut self, seeds: impl IntoIterator<Item = TerminationRef>) {
        let members = self.reachable(seeds);
        let origins: BTreeSet<_> = members
            .into_iter()
            .filter(|t| {
                self.paths.contains_origin(t)
                    || (!t.is_pass_through() && self.cables.find_by_termination(t).is_some())
            })
            .collect();
        self.retrace_origins(&origins);
    }

    /// Terminations linked to `seeds` by cables or pass-through mappings
    fn reachable(&self, seeds: impl IntoIterator<Item = TerminationRef>) -> BTreeSet<TerminationRef> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<_> = seeds.into_iter().collect();
        while let Some(t) = queue.pop_front() {
            if !self.registry.contains(&t) || !seen.insert(t) {
                continue;
            }
            let Ok(handle) = resolve(&self.registry, &self.cables, t) else {
                continue;
            };
            if let Some(cable) = handle.get_cable() {
                queue.extend(cable.terminations().copied().filter(|peer| !seen.contains(peer)));
            }
            queue.extend(handle.get_pass_through_peers());
        }
        seen
    }

    /// Panel wiring from a front port to its rear port position
    fn rear_link(&self, t: TerminationRef) -> Option<(TerminationRef, u16)> {
        match self.registry.get(&t).map(|r| &r.role) {
            Some(PortRole::FrontPort {
                rear_port: Some(rear),
                rear_port_position,
            }) => Some((TerminationRef::rear_port(*rear), *rear_port_position)),
            _ => None,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Stored trace for a termination, without tracing
    #[must_use]
    pub fn cached_trace(&self, reference: &TerminationRef) -> Option<Trace> {
        self.paths.get(reference)
    }

    /// Trace a termination, serving the stored result when there is one
    ///
    /// A fresh trace that crosses at least one cable is stored, and from then
    /// on maintained like every other origin.
    pub fn trace(&mut self, reference: TerminationRef) -> Result<Trace> {
        if let Some(trace) = self.paths.get(&reference) {
            return Ok(trace);
        }
        let branches = PathTracer::new(&self.registry, &self.cables).trace(reference)?;
        if !is_storable(&branches) {
            return Ok(Trace {
                origin: reference,
                paths: branches,
            });
        }
        self.store(reference, branches.clone());
        Ok(self.paths.get(&reference).unwrap_or(Trace {
            origin: reference,
            paths: branches,
        }))
    }

    /// Trace a termination from scratch, bypassing and not touching the store
    pub fn trace_uncached(&self, reference: TerminationRef) -> Result<Trace> {
        let paths = PathTracer::new(&self.registry, &self.cables).trace(reference)?;
        Ok(Trace {
            origin: reference,
            paths,
        })
    }

    /// Look up a stored path by id
    #[must_use]
    pub fn get_path(&self, id: &PathId) -> Option<&Path> {
        self.paths.path(id)
    }

    /// Whether any branch traced from `reference` is active
    pub fn is_connected(&mut self, reference: TerminationRef) -> Result<bool> {
        Ok(self.trace(reference)?.is_connected())
    }

    /// Connectivity summary for a termination
    pub fn connection_status(&mut self, reference: TerminationRef) -> Result<ConnectionStatus> {
        Ok(self.trace(reference)?.status())
    }

    /// Total cable length of a path in meters, and whether every cable had a
    /// length recorded
    #[must_use]
    pub fn path_length(&self, path: &Path) -> (f64, bool) {
        let mut total = 0.0;
        let mut definitive = true;
        for id in path.cable_ids() {
            match self.cables.get(id).and_then(|c| c.attrs.length_meters()) {
                Some(meters) => total += meters,
                None => definitive = false,
            }
        }
        (total, definitive)
    }

    // =========================================================================
    // Graph views
    // =========================================================================

    /// The whole topology as an undirected graph
    #[must_use]
    pub fn graph(&self) -> TopologyGraph {
        self.build_graph(self.registry.iter().map(|r| r.reference))
    }

    /// The connected component containing `reference`
    pub fn component(&self, reference: TerminationRef) -> Result<TopologyGraph> {
        self.registry.require(&reference)?;
        Ok(self.build_graph(self.reachable([reference])))
    }

    /// Number of connected components, counting lone terminations
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.graph().component_count()
    }

    fn build_graph(&self, members: impl IntoIterator<Item = TerminationRef>) -> TopologyGraph {
        let mut graph = TopologyGraph::default();
        let members: BTreeSet<_> = members.into_iter().collect();
        for &t in &members {
            graph.add_node(t);
        }

        for cable in self.cables.iter() {
            for a in cable.a_terminations.iter().filter(|t| members.contains(*t)) {
                for b in cable.b_terminations.iter().filter(|t| members.contains(*t)) {
                    graph.add_edge(*a, *b, Link::Cable(cable.id));
                }
            }
        }
        for &t in members.iter().filter(|t| t.kind == TerminationKind::FrontPort) {
            if let Some((rear, position)) = self.rear_link(t) {
                if members.contains(&rear) {
                    graph.add_edge(t, rear, Link::PassThrough { position });
                }
            }
        }
        graph
    }

    /// Render a graph view as Graphviz DOT
    #[must_use]
    pub fn render_dot(&self, view: &TopologyGraph) -> String {
        let mut dot = String::from("graph topology {\n");
        dot.push_str("  rankdir=LR;\n");
        dot.push_str("  node [fontsize=10];\n\n");

        for t in view.terminations() {
            let name = self.registry.get(&t).map_or("?", |r| r.name.as_str());
            let shape = if t.is_pass_through() { "box" } else { "ellipse" };
            let _ = writeln!(dot, "  \"{t}\" [label=\"{name}\\n{t}\", shape={shape}];");
        }
        dot.push('\n');

        for (a, b, link) in view.edges() {
            match link {
                Link::Cable(id) => {
                    let (label, style) = self.cables.get(id).map_or((format!("#{id}"), "solid"), |c| {
                        let style = match c.status {
                            CableStatus::Connected => "solid",
                            CableStatus::Planned => "dashed",
                            CableStatus::Decommissioning => "dotted",
                        };
                        (c.display_name(), style)
                    });
                    let _ = writeln!(dot, "  \"{a}\" -- \"{b}\" [label=\"{label}\", style={style}];");
                }
                Link::PassThrough { position } => {
                    let _ = writeln!(
                        dot,
                        "  \"{a}\" -- \"{b}\" [label=\"pos {position}\", color=gray, style=bold];"
                    );
                }
            }
        }

        dot.push_str("}\n");
        dot
    }
}

/// Whether a fresh trace crosses at least one cable and so gets stored
#[must_use]
pub fn is_storable(branches: &[Path]) -> bool {
    branches.iter().any(|p| !p.segments.is_empty())
}

/// What joins two terminations in a [`TopologyGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// A cable between opposite ends
    Cable(CableId),
    /// Panel wiring from a front port to its rear port position
    PassThrough {
        /// Rear port position
        position: u16,
    },
}

/// Undirected petgraph view over terminations
#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    graph: UnGraph<TerminationRef, Link>,
    nodes: HashMap<TerminationRef, NodeIndex>,
}

impl TopologyGraph {
    fn add_node(&mut self, t: TerminationRef) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(&t) {
            return idx;
        }
        let idx = self.graph.add_node(t);
        self.nodes.insert(t, idx);
        idx
    }

    fn add_edge(&mut self, a: TerminationRef, b: TerminationRef, link: Link) {
        let a = self.add_node(a);
        let b = self.add_node(b);
        self.graph.add_edge(a, b, link);
    }

    /// Whether the termination is in this view
    #[must_use]
    pub fn contains(&self, t: &TerminationRef) -> bool {
        self.nodes.contains_key(t)
    }

    /// Terminations, sorted
    #[must_use]
    pub fn terminations(&self) -> Vec<TerminationRef> {
        let mut terms: Vec<_> = self.nodes.keys().copied().collect();
        terms.sort();
        terms
    }

    /// Cables with both ends in this view
    #[must_use]
    pub fn cables(&self) -> BTreeSet<CableId> {
        self.graph
            .edge_weights()
            .filter_map(|link| match link {
                Link::Cable(id) => Some(*id),
                Link::PassThrough { .. } => None,
            })
            .collect()
    }

    /// Edges as (termination, termination, link)
    #[must_use]
    pub fn edges(&self) -> Vec<(TerminationRef, TerminationRef, Link)> {
        self.graph
            .edge_indices()
            .filter_map(|e| {
                let (a, b) = self.graph.edge_endpoints(e)?;
                Some((self.graph[a], self.graph[b], self.graph[e]))
            })
            .collect()
    }

    /// Number of terminations
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of links
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Number of connected components
    #[must_use]
    pub fn component_count(&self) -> usize {
        petgraph::algo::connected_components(&self.graph)
    }
}
