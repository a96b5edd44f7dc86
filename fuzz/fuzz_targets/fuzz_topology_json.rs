// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use cabletrace::topology::Topology;
use libfuzzer_sys::fuzz_target;

// Arbitrary topology files must load or fail cleanly, and a loaded one must trace
fuzz_target!(|data: &[u8]| {
    if let Ok(topology) = serde_json::from_slice::<Topology>(data) {
        let origins: Vec<_> = topology.registry().iter().map(|r| r.reference).take(16).collect();
        for origin in origins {
            let _ = topology.trace_uncached(origin);
        }
    }
});
