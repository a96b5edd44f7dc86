// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use arbitrary::Arbitrary;
use cabletrace::registry::TerminationRecord;
use cabletrace::topology::Topology;
use cabletrace::types::{CableAttrs, CableStatus, TerminationRef};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    Connect { a: u8, b: u8, planned: bool },
    Flip { cable: u8 },
    Swap { cable: u8 },
    Delete { cable: u8 },
    RemovePort { port: u8 },
}

/// Four interfaces and two 2-position panels; port numbers index into this fixed set
fn port(n: u8) -> TerminationRef {
    match n % 10 {
        n @ 0..=3 => TerminationRef::interface(u64::from(n)),
        n @ 4..=5 => TerminationRef::rear_port(u64::from(n - 3)),
        n => TerminationRef::front_port(u64::from(n - 5)),
    }
}

// Any sequence of mutations keeps cached traces equal to fresh ones
fuzz_target!(|ops: Vec<Op>| {
    let mut topo = Topology::new();
    for id in 0..4 {
        let _ = topo.add_termination(TerminationRecord::endpoint(TerminationRef::interface(id), "eth"));
    }
    for rear in 1..=2 {
        let _ = topo.add_termination(TerminationRecord::rear_port(rear, "R", 2));
        let _ = topo.add_termination(TerminationRecord::front_port(rear * 2 - 1, "F", rear, 1));
        let _ = topo.add_termination(TerminationRecord::front_port(rear * 2, "F", rear, 2));
    }

    for op in ops.into_iter().take(32) {
        let _ = match op {
            Op::Connect { a, b, planned } => {
                let status = if planned { CableStatus::Planned } else { CableStatus::Connected };
                topo.create_cable([port(a)], [port(b)], status, CableAttrs::default())
                    .map(|_| ())
            }
            Op::Flip { cable } => topo.update_cable_status(u64::from(cable % 8), CableStatus::Decommissioning),
            Op::Swap { cable } => topo.swap_cable_sides(u64::from(cable % 8)),
            Op::Delete { cable } => topo.delete_cable(u64::from(cable % 8)).map(|_| ()),
            Op::RemovePort { port: p } => topo.remove_termination(port(p)).map(|_| ()),
        };
    }

    let origins: Vec<_> = topo.paths().origins().copied().collect();
    for origin in origins {
        let cached = topo.cached_trace(&origin).expect("stored origin has a trace");
        let fresh = topo.trace_uncached(origin).expect("stored origin still exists");
        let ids = |paths: &[cabletrace::types::Path]| {
            let mut ids: Vec<_> = paths.iter().map(|p| p.id.clone()).collect();
            ids.sort();
            ids
        };
        assert_eq!(ids(&cached.paths), ids(&fresh.paths));
    }
});
