// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Path store - the most recently traced paths, indexed for invalidation

use crate::types::{CableId, Path, PathId, TerminationRef, Trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Stored paths keyed by id, with reverse indexes by origin, cable and
/// termination
///
/// A path shared by several origins (identical segments and outcome) is
/// stored once and lists every origin that reaches it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Path>", into = "Vec<Path>")]
pub struct PathStore {
    paths: BTreeMap<PathId, Path>,
    /// origin -> its branches, in traversal order
    by_origin: HashMap<TerminationRef, Vec<PathId>>,
    by_cable: HashMap<CableId, BTreeSet<PathId>>,
    /// pass-through hops and where the path ended
    by_termination: HashMap<TerminationRef, BTreeSet<PathId>>,
}

impl From<Vec<Path>> for PathStore {
    fn from(paths: Vec<Path>) -> Self {
        let mut store = Self::default();
        for path in paths {
            for origin in &path.origins {
                store.by_origin.entry(*origin).or_default().push(path.id.clone());
            }
            store.index(&path);
            store.paths.insert(path.id.clone(), path);
        }
        store
    }
}

impl From<PathStore> for Vec<Path> {
    fn from(store: PathStore) -> Self {
        // Branch order per origin is part of the stored state; keep it by
        // emitting paths in the order their first origin lists them.
        let mut emitted = BTreeSet::new();
        let mut out = Vec::with_capacity(store.paths.len());
        let mut origins: Vec<_> = store.by_origin.iter().collect();
        origins.sort_by_key(|(origin, _)| **origin);
        for (_, ids) in origins {
            for id in ids {
                if emitted.insert(id.clone()) {
                    if let Some(path) = store.paths.get(id) {
                        out.push(path.clone());
                    }
                }
            }
        }
        out
    }
}

impl PathStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn index(&mut self, path: &Path) {
        for cable in path.cable_ids() {
            self.by_cable.entry(cable).or_default().insert(path.id.clone());
        }
        for t in path.terminations() {
            self.by_termination.entry(t).or_default().insert(path.id.clone());
        }
    }

    fn unindex(&mut self, path: &Path) {
        for cable in path.cable_ids() {
            if let Some(ids) = self.by_cable.get_mut(&cable) {
                ids.remove(&path.id);
                if ids.is_empty() {
                    self.by_cable.remove(&cable);
                }
            }
        }
        for t in path.terminations() {
            if let Some(ids) = self.by_termination.get_mut(&t) {
                ids.remove(&path.id);
                if ids.is_empty() {
                    self.by_termination.remove(&t);
                }
            }
        }
    }

    /// Stored trace for an origin
    #[must_use]
    pub fn get(&self, origin: &TerminationRef) -> Option<Trace> {
        let ids = self.by_origin.get(origin)?;
        Some(Trace {
            origin: *origin,
            paths: ids.iter().filter_map(|id| self.paths.get(id)).cloned().collect(),
        })
    }

    /// Stored path by id
    #[must_use]
    pub fn path(&self, id: &PathId) -> Option<&Path> {
        self.paths.get(id)
    }

    /// Whether a trace is stored for this origin
    #[must_use]
    pub fn contains_origin(&self, origin: &TerminationRef) -> bool {
        self.by_origin.contains_key(origin)
    }

    /// Replace every branch stored for `origin`
    ///
    /// Branches identical to one already stored for another origin are
    /// merged into it.
    pub fn replace(&mut self, origin: TerminationRef, branches: Vec<Path>) {
        self.remove_origin(&origin);

        let mut ids = Vec::with_capacity(branches.len());
        for mut branch in branches {
            let id = branch.id.clone();
            if let Some(existing) = self.paths.get_mut(&id) {
                existing.origins.insert(origin);
                existing.is_active = branch.is_active;
            } else {
                branch.origins = BTreeSet::from([origin]);
                self.index(&branch);
                self.paths.insert(id.clone(), branch);
            }
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        self.by_origin.insert(origin, ids);
    }

    /// Forget everything stored for `origin`
    ///
    /// Paths left without any origin are deleted.
    pub fn remove_origin(&mut self, origin: &TerminationRef) -> bool {
        let Some(ids) = self.by_origin.remove(origin) else {
            return false;
        };
        for id in ids {
            let orphaned = match self.paths.get_mut(&id) {
                Some(path) => {
                    path.origins.remove(origin);
                    path.origins.is_empty()
                }
                None => false,
            };
            if orphaned {
                if let Some(path) = self.paths.remove(&id) {
                    self.unindex(&path);
                }
            }
        }
        true
    }

    /// Origins of every path that crosses `cable`
    #[must_use]
    pub fn origins_through_cable(&self, cable: CableId) -> BTreeSet<TerminationRef> {
        self.origins_of(self.by_cable.get(&cable))
    }

    /// Origins of every path that starts at, passes through or ends at `termination`
    #[must_use]
    pub fn origins_touching(&self, termination: &TerminationRef) -> BTreeSet<TerminationRef> {
        let mut origins = self.origins_of(self.by_termination.get(termination));
        if self.contains_origin(termination) {
            origins.insert(*termination);
        }
        origins
    }

    fn origins_of(&self, ids: Option<&BTreeSet<PathId>>) -> BTreeSet<TerminationRef> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.paths.get(id))
            .flat_map(|p| p.origins.iter().copied())
            .collect()
    }

    /// Every origin with a stored trace
    pub fn origins(&self) -> impl Iterator<Item = &TerminationRef> {
        self.by_origin.keys()
    }

    /// Every stored path, ordered by id
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    /// Number of distinct stored paths
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
