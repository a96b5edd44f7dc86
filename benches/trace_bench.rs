// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Benchmarks for path tracing over long panel chains and wide fan-outs

use cabletrace::registry::TerminationRecord;
use cabletrace::topology::Topology;
use cabletrace::types::{CableAttrs, CableStatus, TerminationRef};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn connect(topo: &mut Topology, a: TerminationRef, b: TerminationRef) {
    topo.create_cable([a], [b], CableStatus::Connected, CableAttrs::default())
        .unwrap();
}

/// interface:0 -> `panels` single-position patch panels -> interface:1
fn panel_chain(panels: u64) -> Topology {
    let mut topo = Topology::new();
    for id in [0, 1] {
        topo.add_termination(TerminationRecord::endpoint(TerminationRef::interface(id), format!("eth{id}")))
            .unwrap();
    }
    for id in 1..=panels {
        topo.add_termination(TerminationRecord::rear_port(id, format!("R{id}"), 1)).unwrap();
        topo.add_termination(TerminationRecord::front_port(id, format!("F{id}"), id, 1)).unwrap();
    }

    connect(&mut topo, TerminationRef::interface(0), TerminationRef::rear_port(1));
    for id in 1..panels {
        connect(&mut topo, TerminationRef::front_port(id), TerminationRef::rear_port(id + 1));
    }
    connect(&mut topo, TerminationRef::front_port(panels), TerminationRef::interface(1));
    topo
}

/// interface:0 -> one rear port with `width` positions, each front patched to its own interface
fn fan_out(width: u16) -> Topology {
    let mut topo = Topology::new();
    topo.add_termination(TerminationRecord::endpoint(TerminationRef::interface(0), "uplink"))
        .unwrap();
    topo.add_termination(TerminationRecord::rear_port(1, "R1", width)).unwrap();
    for position in 1..=width {
        let id = u64::from(position);
        topo.add_termination(TerminationRecord::front_port(id, format!("F{id}"), 1, position))
            .unwrap();
        topo.add_termination(TerminationRecord::endpoint(TerminationRef::interface(id), format!("eth{id}")))
            .unwrap();
    }
    connect(&mut topo, TerminationRef::interface(0), TerminationRef::rear_port(1));
    for position in 1..=width {
        let id = u64::from(position);
        connect(&mut topo, TerminationRef::front_port(id), TerminationRef::interface(id));
    }
    topo
}

/// Trace across 200 patch panels end to end.
fn bench_trace_panel_chain(c: &mut Criterion) {
    let topo = panel_chain(200);

    c.bench_function("trace_panel_chain_200", |b| {
        b.iter(|| {
            let trace = topo.trace_uncached(black_box(TerminationRef::interface(0))).unwrap();
            assert!(trace.is_connected());
        });
    });
}

/// Trace from an uplink into a 48-position rear port.
fn bench_trace_fan_out(c: &mut Criterion) {
    let topo = fan_out(48);

    c.bench_function("trace_fan_out_48", |b| {
        b.iter(|| {
            let trace = topo.trace_uncached(black_box(TerminationRef::interface(0))).unwrap();
            assert_eq!(trace.paths.len(), 48);
        });
    });
}

/// Status flip on the middle cable of a chain, including the retrace it triggers.
fn bench_status_flip_retrace(c: &mut Criterion) {
    let mut topo = panel_chain(50);
    let middle = topo
        .cables()
        .find_by_termination(&TerminationRef::front_port(25))
        .map(|cable| cable.id)
        .unwrap();

    c.bench_function("status_flip_retrace_50", |b| {
        b.iter(|| {
            topo.update_cable_status(black_box(middle), CableStatus::Planned).unwrap();
            topo.update_cable_status(black_box(middle), CableStatus::Connected).unwrap();
        });
    });
}

criterion_group!(
    benches,
    bench_trace_panel_chain,
    bench_trace_fan_out,
    bench_status_flip_retrace
);
criterion_main!(benches);
