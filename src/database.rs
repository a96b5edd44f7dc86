// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Durable topology handle
//!
//! Writers are serialized by an `RwLock` and every transaction that changed
//! something is persisted before its lock is released. Transactions mutate
//! the live topology in place under its journal; one that fails is rolled
//! back, leaving both memory and the file on disk as they were.

use crate::error::{Result, TopologyError};
use crate::topology::{is_storable, Topology};
use crate::types::{TerminationRef, Trace};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// File name of the persisted topology inside the data directory
pub const TOPOLOGY_FILE: &str = "topology.json";

/// Shared, persistent topology
#[derive(Debug)]
pub struct TopologyDb {
    inner: RwLock<Topology>,
    dir: Option<PathBuf>,
}

impl TopologyDb {
    /// A database that is never written to disk
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(Topology::new()),
            dir: None,
        }
    }

    /// Open (or start) the topology stored in `dir`
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let topology = load(&dir)?;
        tracing::debug!(
            "Opened topology in {} ({} terminations, {} cables, {} paths)",
            dir.display(),
            topology.registry().len(),
            topology.cables().len(),
            topology.paths().len()
        );
        Ok(Self {
            inner: RwLock::new(topology),
            dir: Some(dir),
        })
    }

    /// Data directory, if persistent
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Run a read-only closure against the topology
    pub fn read<T>(&self, f: impl FnOnce(&Topology) -> T) -> Result<T> {
        let guard = self.inner.read().map_err(|_| TopologyError::Poisoned)?;
        Ok(f(&guard))
    }

    /// Run a mutation and persist it
    ///
    /// The save is skipped when the closure changed nothing. If the closure
    /// or the save fails, every change it made is rolled back.
    pub fn transaction<T>(&self, f: impl FnOnce(&mut Topology) -> Result<T>) -> Result<T> {
        let mut guard = self.inner.write().map_err(|_| TopologyError::Poisoned)?;
        guard.begin();
        let outcome = f(&mut *guard).and_then(|value| {
            if let Some(dir) = self.dir.as_deref().filter(|_| guard.has_changes()) {
                save(dir, &guard)?;
            }
            Ok(value)
        });
        match outcome {
            Ok(value) => {
                guard.commit();
                Ok(value)
            }
            Err(err) => {
                guard.rollback();
                Err(err)
            }
        }
    }

    /// Trace a termination
    ///
    /// The write lock is taken only on a cache miss whose result will be
    /// stored; traces that cross no cable are answered under the read lock.
    pub fn trace(&self, reference: TerminationRef) -> Result<Trace> {
        let fresh = self.read(|t| match t.cached_trace(&reference) {
            Some(trace) => Ok(Some(trace)),
            None => t
                .trace_uncached(reference)
                .map(|trace| (!is_storable(&trace.paths)).then_some(trace)),
        })??;
        if let Some(trace) = fresh {
            return Ok(trace);
        }
        self.transaction(|t| t.trace(reference))
    }

    /// Whether any branch traced from `reference` is active
    pub fn is_connected(&self, reference: TerminationRef) -> Result<bool> {
        Ok(self.trace(reference)?.is_connected())
    }

    /// Clone of the current topology
    pub fn snapshot(&self) -> Result<Topology> {
        self.read(Clone::clone)
    }
}

/// Read `topology.json` from `dir`, or an empty topology if it is absent
pub fn load(dir: &Path) -> Result<Topology> {
    let path = dir.join(TOPOLOGY_FILE);
    if !path.exists() {
        return Ok(Topology::new());
    }
    let content = fs::read_to_string(&path).map_err(|source| TopologyError::Storage {
        context: format!("Failed to read {}", path.display()),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Write `topology.json` to `dir` through a temp file and rename
pub fn save(dir: &Path, topology: &Topology) -> Result<()> {
    fs::create_dir_all(dir).map_err(|source| TopologyError::Storage {
        context: format!("Failed to create directory {}", dir.display()),
        source,
    })?;

    let path = dir.join(TOPOLOGY_FILE);
    let tmp = dir.join(format!("{TOPOLOGY_FILE}.tmp"));
    let json = serde_json::to_string_pretty(topology)?;
    fs::write(&tmp, json).map_err(|source| TopologyError::Storage {
        context: format!("Failed to write {}", tmp.display()),
        source,
    })?;
    fs::rename(&tmp, &path).map_err(|source| TopologyError::Storage {
        context: format!("Failed to replace {}", path.display()),
        source,
    })?;
    Ok(())
}
