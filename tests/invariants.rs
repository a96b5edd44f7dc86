// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Invariant tests for cable path resolution
//!
//! These tests verify critical invariants:
//! 1. Chain symmetry - both ends of a simple chain see reversed paths
//! 2. Determinism - tracing twice without a mutation is bit-identical
//! 3. Locality - mutations never touch paths in another component
//! 4. Termination - loops are reported, never followed forever
//! 5. Atomicity - rejected mutations leave no trace

use cabletrace::database::TopologyDb;
use cabletrace::error::TopologyError;
use cabletrace::registry::TerminationRecord;
use cabletrace::topology::Topology;
use cabletrace::types::{
    CableAttrs, CableId, CableStatus, ConnectionStatus, DeadEndReason, IncompleteReason, PathOutcome,
    PathSegment, TerminationRef,
};
use proptest::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn add_interface(topo: &mut Topology, id: u64) -> TerminationRef {
    let r = TerminationRef::interface(id);
    topo.add_termination(TerminationRecord::endpoint(r, format!("eth{id}")).with_parent("sw1"))
        .unwrap();
    r
}

fn add_panel(topo: &mut Topology, id: u64, positions: u16) -> (TerminationRef, TerminationRef) {
    topo.add_termination(TerminationRecord::rear_port(id, format!("R{id}"), positions))
        .unwrap();
    topo.add_termination(TerminationRecord::front_port(id, format!("F{id}"), id, 1))
        .unwrap();
    (TerminationRef::rear_port(id), TerminationRef::front_port(id))
}

fn connect(topo: &mut Topology, a: TerminationRef, b: TerminationRef, status: CableStatus) -> CableId {
    topo.create_cable([a], [b], status, CableAttrs::default())
        .unwrap()
        .id
}

/// Chain `eth(base+1) - panel - ... - panel - eth(base+2)` with one cable per status
struct Chain {
    a: TerminationRef,
    b: TerminationRef,
    cables: Vec<CableId>,
}

fn build_chain(topo: &mut Topology, base: u64, statuses: &[CableStatus]) -> Chain {
    assert!(!statuses.is_empty());
    let a = add_interface(topo, base + 1);
    let b = add_interface(topo, base + 2);

    let mut cables = Vec::new();
    let mut near = a;
    let panels = statuses.len() - 1;
    for (i, status) in statuses.iter().take(panels).enumerate() {
        let (rear, front) = add_panel(topo, base + 1 + i as u64, 1);
        cables.push(connect(topo, near, rear, *status));
        near = front;
    }
    cables.push(connect(topo, near, b, statuses[panels]));
    Chain { a, b, cables }
}

fn status_strategy() -> impl Strategy<Value = CableStatus> {
    prop_oneof![
        Just(CableStatus::Connected),
        Just(CableStatus::Planned),
        Just(CableStatus::Decommissioning),
    ]
}

// =============================================================================
// Chain Symmetry
// =============================================================================

proptest! {
    #[test]
    fn prop_chain_ends_see_reversed_paths(statuses in prop::collection::vec(status_strategy(), 1..8)) {
        let mut topo = Topology::new();
        let chain = build_chain(&mut topo, 0, &statuses);

        let from_a = topo.trace(chain.a).unwrap();
        let from_b = topo.trace(chain.b).unwrap();
        prop_assert_eq!(from_a.paths.len(), 1);
        prop_assert_eq!(from_b.paths.len(), 1);

        let (pa, pb) = (&from_a.paths[0], &from_b.paths[0]);
        prop_assert_eq!(pa.reversed_segments(), pb.segments.clone());
        prop_assert_eq!(pa.is_active, pb.is_active);
        prop_assert_eq!(pa.outcome.endpoint(), Some(chain.b));
        prop_assert_eq!(pb.outcome.endpoint(), Some(chain.a));

        let all_connected = statuses.iter().all(|s| *s == CableStatus::Connected);
        prop_assert_eq!(pa.is_active, all_connected);
        prop_assert_eq!(pa.cable_ids().collect::<Vec<_>>(), chain.cables);
    }
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_trace_is_idempotent() {
    let mut topo = Topology::new();
    let chain = build_chain(&mut topo, 0, &[CableStatus::Connected; 3]);

    let first = topo.trace(chain.a).unwrap();
    let stored = topo.paths().len();
    let second = topo.trace(chain.a).unwrap();
    assert_eq!(first, second);
    assert_eq!(topo.paths().len(), stored);

    // The cached result equals a fresh trace
    let fresh = topo.trace_uncached(chain.a).unwrap();
    assert_eq!(
        fresh.paths.iter().map(|p| &p.id).collect::<Vec<_>>(),
        first.paths.iter().map(|p| &p.id).collect::<Vec<_>>()
    );
}

#[test]
fn test_path_ids_are_stable_across_topologies() {
    let mut one = Topology::new();
    let mut two = Topology::new();
    let c1 = build_chain(&mut one, 0, &[CableStatus::Connected; 2]);
    let c2 = build_chain(&mut two, 0, &[CableStatus::Connected; 2]);

    assert_eq!(
        one.trace(c1.a).unwrap().paths[0].id,
        two.trace(c2.a).unwrap().paths[0].id
    );
}

// =============================================================================
// Locality
// =============================================================================

#[test]
fn test_mutations_do_not_touch_other_components() {
    let mut topo = Topology::new();
    let x = build_chain(&mut topo, 0, &[CableStatus::Connected; 3]);
    let y = build_chain(&mut topo, 100, &[CableStatus::Connected; 2]);

    let y_before = (topo.cached_trace(&y.a).unwrap(), topo.cached_trace(&y.b).unwrap());

    topo.update_cable_status(x.cables[1], CableStatus::Planned).unwrap();
    topo.swap_cable_sides(x.cables[0]).unwrap();
    topo.delete_cable(x.cables[2]).unwrap();
    let spare = add_interface(&mut topo, 50);
    let front = TerminationRef::front_port(2);
    connect(&mut topo, front, spare, CableStatus::Connected);

    let y_after = (topo.cached_trace(&y.a).unwrap(), topo.cached_trace(&y.b).unwrap());
    assert_eq!(y_before, y_after);
    assert!(topo
        .paths()
        .iter()
        .filter(|p| p.origins.contains(&y.a))
        .all(|p| x.cables.iter().all(|c| !p.contains_cable(*c))));
}

// =============================================================================
// Loop Safety
// =============================================================================

#[test]
fn test_panel_ring_reports_loop() {
    let mut topo = Topology::new();
    let (rear1, front1) = add_panel(&mut topo, 1, 1);
    let (rear2, front2) = add_panel(&mut topo, 2, 1);
    let c1 = connect(&mut topo, rear1, front2, CableStatus::Connected);
    connect(&mut topo, rear2, front1, CableStatus::Connected);

    let trace = topo.trace(rear1).unwrap();
    assert_eq!(trace.paths.len(), 1);
    assert_eq!(trace.paths[0].outcome, PathOutcome::Loop { cable: c1 });
    assert!(!trace.paths[0].is_active);
    assert_eq!(
        trace.status(),
        ConnectionStatus::Incomplete(IncompleteReason::Loop(c1))
    );
}

#[test]
fn test_hairpin_patch_reports_loop() {
    // eth1 - R1 (2 positions) | F1 and F2 patched to each other
    let mut topo = Topology::new();
    let eth = add_interface(&mut topo, 1);
    topo.add_termination(TerminationRecord::rear_port(1, "R1", 2)).unwrap();
    topo.add_termination(TerminationRecord::front_port(1, "F1", 1, 1)).unwrap();
    topo.add_termination(TerminationRecord::front_port(2, "F2", 1, 2)).unwrap();
    let uplink = connect(&mut topo, eth, TerminationRef::rear_port(1), CableStatus::Connected);
    connect(
        &mut topo,
        TerminationRef::front_port(1),
        TerminationRef::front_port(2),
        CableStatus::Connected,
    );

    let trace = topo.trace(eth).unwrap();
    assert_eq!(trace.paths.len(), 2);
    assert!(trace.paths.iter().all(|p| p.outcome == PathOutcome::Loop { cable: uplink }));
    assert_eq!(
        topo.connection_status(eth).unwrap(),
        ConnectionStatus::Incomplete(IncompleteReason::Loop(uplink))
    );
}

// =============================================================================
// Fan-out
// =============================================================================

#[test]
fn test_three_way_fan_out() {
    let mut topo = Topology::new();
    let upstream = add_interface(&mut topo, 1);
    topo.add_termination(TerminationRecord::rear_port(1, "trunk", 3)).unwrap();
    let rear = TerminationRef::rear_port(1);
    connect(&mut topo, upstream, rear, CableStatus::Connected);

    let statuses = [CableStatus::Connected, CableStatus::Planned, CableStatus::Connected];
    for (i, status) in statuses.iter().enumerate() {
        let pos = i as u16 + 1;
        let id = u64::from(pos);
        topo.add_termination(TerminationRecord::front_port(id, format!("F{id}"), 1, pos))
            .unwrap();
        let dst = add_interface(&mut topo, 10 + id);
        connect(&mut topo, TerminationRef::front_port(id), dst, *status);
    }

    let trace = topo.trace(upstream).unwrap();
    assert_eq!(trace.paths.len(), 3);
    assert!(trace.is_split());
    assert_eq!(
        trace.paths.iter().map(|p| p.is_active).collect::<Vec<_>>(),
        vec![true, false, true]
    );
    assert_eq!(
        trace.endpoints(),
        vec![
            TerminationRef::interface(11),
            TerminationRef::interface(12),
            TerminationRef::interface(13)
        ]
    );
    assert!(trace.is_connected());
}

// =============================================================================
// Atomicity
// =============================================================================

#[test]
fn test_duplicate_termination_rejected_without_mutation() {
    let mut topo = Topology::new();
    let chain = build_chain(&mut topo, 0, &[CableStatus::Connected]);
    let extra = add_interface(&mut topo, 9);
    let cables_before = topo.cables().len();
    let trace_before = topo.cached_trace(&chain.b).unwrap();

    let err = topo
        .create_cable([extra], [chain.b], CableStatus::Connected, CableAttrs::default())
        .unwrap_err();
    assert!(matches!(err, TopologyError::DuplicateTermination { termination, .. } if termination == chain.b));
    assert_eq!(topo.cables().len(), cables_before);
    assert!(topo.cables().find_by_termination(&extra).is_none());
    assert_eq!(topo.cached_trace(&chain.b).unwrap(), trace_before);
}

#[test]
fn test_virtual_interface_cannot_be_cabled() {
    let mut topo = Topology::new();
    let eth = add_interface(&mut topo, 1);
    let lag = TerminationRef::interface(2);
    topo.add_termination(TerminationRecord {
        reference: lag,
        name: "bond0".into(),
        parent: None,
        role: cabletrace::registry::PortRole::VirtualInterface,
    })
    .unwrap();

    let err = topo
        .create_cable([eth], [lag], CableStatus::Connected, CableAttrs::default())
        .unwrap_err();
    assert!(matches!(err, TopologyError::InvalidTermination(_)));
    assert!(topo.cables().is_empty());
}

// =============================================================================
// Status Propagation
// =============================================================================

#[test]
fn test_status_flip_only_affects_paths_through_cable() {
    let mut topo = Topology::new();
    let chain = build_chain(&mut topo, 0, &[CableStatus::Connected; 3]);
    let other = build_chain(&mut topo, 100, &[CableStatus::Connected]);
    let mid = chain.cables[1];

    topo.update_cable_status(mid, CableStatus::Planned).unwrap();

    for path in topo.paths().iter() {
        if path.contains_cable(mid) {
            assert!(!path.is_active, "{} still active", path.id);
        } else {
            assert!(path.is_active);
        }
    }
    assert!(!topo.is_connected(chain.a).unwrap());
    assert!(!topo.is_connected(chain.b).unwrap());
    assert!(topo.is_connected(other.a).unwrap());

    topo.update_cable_status(mid, CableStatus::Connected).unwrap();
    assert!(topo.is_connected(chain.a).unwrap());
}

// =============================================================================
// Example Scenarios
// =============================================================================

#[test]
fn test_single_panel_scenario() {
    // I1 -cable1- R1 | F1 -cable2- I2
    let mut topo = Topology::new();
    let i1 = add_interface(&mut topo, 1);
    let i2 = add_interface(&mut topo, 2);
    let (r1, f1) = add_panel(&mut topo, 1, 1);
    let cable1 = connect(&mut topo, i1, r1, CableStatus::Connected);
    let cable2 = connect(&mut topo, f1, i2, CableStatus::Connected);

    let trace = topo.trace(i1).unwrap();
    assert_eq!(trace.paths.len(), 1);
    let path = &trace.paths[0];
    assert_eq!(
        path.segments,
        vec![
            PathSegment::Cable { cable: cable1 },
            PathSegment::PassThrough { from: r1, to: f1 },
            PathSegment::Cable { cable: cable2 },
        ]
    );
    assert_eq!(path.cable_count(), 2);
    assert_eq!(path.outcome, PathOutcome::Endpoint { termination: i2 });
    assert!(path.is_active);

    topo.update_cable_status(cable2, CableStatus::Decommissioning).unwrap();
    let after = topo.trace(i1).unwrap();
    assert_eq!(after.paths[0].segments, path.segments);
    assert!(!after.paths[0].is_active);
}

#[test]
fn test_uncabled_interface_is_dead_end() {
    let mut topo = Topology::new();
    let i3 = add_interface(&mut topo, 3);

    let trace = topo.trace(i3).unwrap();
    assert_eq!(trace.paths.len(), 1);
    assert!(trace.paths[0].segments.is_empty());
    assert!(!trace.paths[0].is_active);
    assert_eq!(
        trace.paths[0].outcome,
        PathOutcome::DeadEnd {
            reason: DeadEndReason::NoCable { at: i3 }
        }
    );
    assert_eq!(trace.status(), ConnectionStatus::NotConnected);
}

#[test]
fn test_trunk_between_multi_position_panels() {
    // eth1 - F11 (pos 1 of R1) | R1 === R2 | F21 (pos 1 of R2) - eth2
    // eth3 - F12 (pos 2 of R1) | R1 === R2 | F22 (pos 2 of R2) - eth4
    let mut topo = Topology::new();
    topo.add_termination(TerminationRecord::rear_port(1, "R1", 2)).unwrap();
    topo.add_termination(TerminationRecord::rear_port(2, "R2", 2)).unwrap();
    for (front, rear, pos) in [(11, 1, 1), (12, 1, 2), (21, 2, 1), (22, 2, 2)] {
        topo.add_termination(TerminationRecord::front_port(front, format!("F{front}"), rear, pos))
            .unwrap();
    }
    let eth: Vec<_> = (1..=4).map(|id| add_interface(&mut topo, id)).collect();
    connect(&mut topo, eth[0], TerminationRef::front_port(11), CableStatus::Connected);
    connect(&mut topo, eth[2], TerminationRef::front_port(12), CableStatus::Connected);
    connect(&mut topo, TerminationRef::front_port(21), eth[1], CableStatus::Connected);
    connect(&mut topo, TerminationRef::front_port(22), eth[3], CableStatus::Connected);
    let trunk = connect(
        &mut topo,
        TerminationRef::rear_port(1),
        TerminationRef::rear_port(2),
        CableStatus::Connected,
    );

    assert_eq!(topo.trace(eth[0]).unwrap().endpoints(), vec![eth[1]]);
    assert_eq!(topo.trace(eth[2]).unwrap().endpoints(), vec![eth[3]]);
    assert_eq!(topo.trace(eth[3]).unwrap().endpoints(), vec![eth[2]]);

    topo.update_cable_status(trunk, CableStatus::Planned).unwrap();
    assert!(!topo.is_connected(eth[0]).unwrap());
    assert!(!topo.is_connected(eth[3]).unwrap());
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_topology_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let before = {
        let db = TopologyDb::open(dir.path()).unwrap();
        db.transaction(|t| {
            let chain = build_chain(t, 0, &[CableStatus::Connected, CableStatus::Planned]);
            Ok(chain.a)
        })
        .unwrap();
        db.snapshot().unwrap()
    };

    let db = TopologyDb::open(dir.path()).unwrap();
    let after = db.snapshot().unwrap();
    assert_eq!(after.cables().len(), before.cables().len());
    assert_eq!(
        after.cached_trace(&TerminationRef::interface(1)),
        before.cached_trace(&TerminationRef::interface(1))
    );
    assert!(!db.is_connected(TerminationRef::interface(1)).unwrap());

    // Further mutations keep allocating fresh cable ids
    let id = db
        .transaction(|t| {
            t.update_cable_status(2, CableStatus::Connected)?;
            let spare = TerminationRef::interface(7);
            t.add_termination(TerminationRecord::endpoint(spare, "eth7"))?;
            t.add_termination(TerminationRecord::endpoint(TerminationRef::interface(8), "eth8"))?;
            Ok(t.create_cable([spare], [TerminationRef::interface(8)], CableStatus::Connected, CableAttrs::default())?
                .id)
        })
        .unwrap();
    assert_eq!(id, 3);
    assert!(db.is_connected(TerminationRef::interface(2)).unwrap());
}
