// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use cabletrace::types::TerminationRef;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(reference) = data.parse::<TerminationRef>() {
        let again: TerminationRef = reference.to_string().parse().expect("display must parse back");
        assert_eq!(reference, again);
    }
});
