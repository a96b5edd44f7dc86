// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Path tracer - walks cables and pass-through ports outward from an origin
//!
//! The walk is iterative. Segments live in an append-only arena of prefix
//! nodes; each queued branch points at the tail of its own prefix, so forks
//! at a multi-position rear port share their common prefix without sharing
//! any mutable state. Each branch carries its own visited-cable set (loop
//! detection) and position stack (trunk cables between rear ports).

use crate::cable::CableStore;
use crate::error::Result;
use crate::passthrough;
use crate::registry::{resolve, Connectable, Registry};
use crate::types::{
    CableId, CableStatus, DeadEndReason, Path, PathOutcome, PathSegment, TerminationRef,
};
use std::collections::{BTreeSet, VecDeque};

/// One segment in the prefix arena, linked to its predecessor
#[derive(Debug)]
struct PrefixNode {
    parent: Option<usize>,
    segment: PathSegment,
}

/// A branch waiting to be extended
#[derive(Debug)]
struct Branch {
    /// Last segment of this branch's prefix in the arena
    tail: Option<usize>,
    /// Termination the branch currently stands on
    frontier: TerminationRef,
    /// Cables already crossed by this branch
    visited: BTreeSet<CableId>,
    /// Front port positions entered and not yet left
    positions: Vec<u16>,
}

/// Read-only tracer over a registry and cable store
#[derive(Debug, Clone, Copy)]
pub struct PathTracer<'a> {
    registry: &'a Registry,
    cables: &'a CableStore,
}

impl<'a> PathTracer<'a> {
    /// Create a tracer over the given stores
    #[must_use]
    pub fn new(registry: &'a Registry, cables: &'a CableStore) -> Self {
        Self { registry, cables }
    }

    /// Trace every branch reachable from `start`
    ///
    /// Fails only if `start` itself is unknown. Broken data further along the
    /// path (unmapped ports, loops) ends that branch instead.
    pub fn trace(&self, start: TerminationRef) -> Result<Vec<Path>> {
        self.registry.require(&start)?;

        let mut arena: Vec<PrefixNode> = Vec::new();
        let mut queue = VecDeque::from([Branch {
            tail: None,
            frontier: start,
            visited: BTreeSet::new(),
            positions: Vec::new(),
        }]);
        let mut completed = Vec::new();

        while let Some(branch) = queue.pop_front() {
            let cable = match resolve(self.registry, self.cables, branch.frontier) {
                Ok(handle) => handle.get_cable().cloned(),
                Err(_) => {
                    tracing::warn!("Trace from {} reached unknown termination {}", start, branch.frontier);
                    completed.push(self.finish(
                        &arena,
                        branch.tail,
                        PathOutcome::DeadEnd {
                            reason: DeadEndReason::Unmapped { port: branch.frontier },
                        },
                    ));
                    continue;
                }
            };

            let Some(cable) = cable else {
                completed.push(self.finish(
                    &arena,
                    branch.tail,
                    PathOutcome::DeadEnd {
                        reason: DeadEndReason::NoCable { at: branch.frontier },
                    },
                ));
                continue;
            };

            if branch.visited.contains(&cable.id) {
                tracing::warn!("Loop detected tracing from {}: cable #{} crossed twice", start, cable.id);
                completed.push(self.finish(&arena, branch.tail, PathOutcome::Loop { cable: cable.id }));
                continue;
            }

            let tail = push(&mut arena, branch.tail, PathSegment::Cable { cable: cable.id });
            let mut visited = branch.visited;
            visited.insert(cable.id);

            let far = cable.far_side(&branch.frontier).unwrap_or_default();
            if far.is_empty() {
                completed.push(self.finish(
                    &arena,
                    Some(tail),
                    PathOutcome::DeadEnd {
                        reason: DeadEndReason::OpenCable { cable: cable.id },
                    },
                ));
                continue;
            }

            let (ports, endpoints): (Vec<_>, Vec<_>) =
                far.iter().copied().partition(|&t| self.passes_through(t));

            let count = endpoints.len();
            for termination in endpoints {
                let outcome = if count > 1 {
                    PathOutcome::Split { termination, count }
                } else {
                    PathOutcome::Endpoint { termination }
                };
                completed.push(self.finish(&arena, Some(tail), outcome));
            }

            for port in ports {
                match passthrough::traverse(self.registry, port, &branch.positions) {
                    Ok(hops) => {
                        for hop in hops {
                            let hop_tail = push(
                                &mut arena,
                                Some(tail),
                                PathSegment::PassThrough { from: port, to: hop.peer },
                            );
                            queue.push_back(Branch {
                                tail: Some(hop_tail),
                                frontier: hop.peer,
                                visited: visited.clone(),
                                positions: hop.positions,
                            });
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Trace from {} stopped at {}: {}", start, port, err);
                        completed.push(self.finish(
                            &arena,
                            Some(tail),
                            PathOutcome::DeadEnd {
                                reason: DeadEndReason::Unmapped { port },
                            },
                        ));
                    }
                }
            }
        }

        tracing::debug!("Traced {} branch(es) from {}", completed.len(), start);
        Ok(completed)
    }

    /// Whether a branch arriving at `t` continues across a panel
    ///
    /// Unregistered terminations fall back to their kind, so a dangling port
    /// still ends its branch as unmapped.
    fn passes_through(&self, t: TerminationRef) -> bool {
        resolve(self.registry, self.cables, t).map_or(t.is_pass_through(), |handle| handle.is_pass_through())
    }

    /// Materialize a branch's segments and compute `is_active`
    fn finish(&self, arena: &[PrefixNode], tail: Option<usize>, outcome: PathOutcome) -> Path {
        let mut segments = Vec::new();
        let mut cursor = tail;
        while let Some(idx) = cursor {
            segments.push(arena[idx].segment.clone());
            cursor = arena[idx].parent;
        }
        segments.reverse();

        let mut cables = segments.iter().filter_map(PathSegment::cable_id).peekable();
        let has_cable = cables.peek().is_some();
        let all_connected = cables.all(|id| {
            self.cables
                .get(id)
                .is_some_and(|c| c.status == CableStatus::Connected)
        });
        let is_active = has_cable && all_connected && outcome.is_complete();

        Path::new(segments, outcome, is_active)
    }
}

fn push(arena: &mut Vec<PrefixNode>, parent: Option<usize>, segment: PathSegment) -> usize {
    arena.push(PrefixNode { parent, segment });
    arena.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TerminationRecord;
    use crate::types::{CableAttrs, TerminationKind};

    struct Fixture {
        registry: Registry,
        cables: CableStore,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: Registry::new(),
                cables: CableStore::new(),
            }
        }

        fn interface(&mut self, id: u64) -> TerminationRef {
            let r = TerminationRef::interface(id);
            self.registry
                .insert(TerminationRecord::endpoint(r, format!("eth{id}")))
                .unwrap();
            r
        }

        fn rear(&mut self, id: u64, positions: u16) -> TerminationRef {
            self.registry
                .insert(TerminationRecord::rear_port(id, format!("rear{id}"), positions))
                .unwrap();
            TerminationRef::rear_port(id)
        }

        fn front(&mut self, id: u64, rear: u64, position: u16) -> TerminationRef {
            self.registry
                .insert(TerminationRecord::front_port(id, format!("front{id}"), rear, position))
                .unwrap();
            TerminationRef::front_port(id)
        }

        fn cable(&mut self, a: &[TerminationRef], b: &[TerminationRef], status: CableStatus) -> CableId {
            self.cables
                .create(
                    &self.registry,
                    a.iter().copied(),
                    b.iter().copied(),
                    status,
                    CableAttrs::default(),
                )
                .unwrap()
                .id
        }

        fn trace(&self, start: TerminationRef) -> Vec<Path> {
            PathTracer::new(&self.registry, &self.cables).trace(start).unwrap()
        }
    }

    #[test]
    fn test_uncabled_termination_is_dead_end() {
        let mut fx = Fixture::new();
        let i3 = fx.interface(3);

        let paths = fx.trace(i3);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].segments.is_empty());
        assert!(!paths[0].is_active);
        assert_eq!(
            paths[0].outcome,
            PathOutcome::DeadEnd {
                reason: DeadEndReason::NoCable { at: i3 }
            }
        );
    }

    #[test]
    fn test_direct_cable() {
        let mut fx = Fixture::new();
        let a = fx.interface(1);
        let b = fx.interface(2);
        let c = fx.cable(&[a], &[b], CableStatus::Connected);

        let paths = fx.trace(a);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].segments, vec![PathSegment::Cable { cable: c }]);
        assert_eq!(paths[0].outcome, PathOutcome::Endpoint { termination: b });
        assert!(paths[0].is_active);
    }

    #[test]
    fn test_chain_through_single_position_panel() {
        let mut fx = Fixture::new();
        let i1 = fx.interface(1);
        let i2 = fx.interface(2);
        let r1 = fx.rear(1, 1);
        let f1 = fx.front(1, 1, 1);
        let c1 = fx.cable(&[i1], &[r1], CableStatus::Connected);
        let c2 = fx.cable(&[f1], &[i2], CableStatus::Connected);

        let paths = fx.trace(i1);
        assert_eq!(paths.len(), 1);
        assert_eq!(
            paths[0].segments,
            vec![
                PathSegment::Cable { cable: c1 },
                PathSegment::PassThrough { from: r1, to: f1 },
                PathSegment::Cable { cable: c2 },
            ]
        );
        assert_eq!(paths[0].outcome, PathOutcome::Endpoint { termination: i2 });
        assert!(paths[0].is_active);
    }

    #[test]
    fn test_planned_cable_makes_path_inactive() {
        let mut fx = Fixture::new();
        let a = fx.interface(1);
        let b = fx.interface(2);
        fx.cable(&[a], &[b], CableStatus::Planned);

        let paths = fx.trace(a);
        assert!(paths[0].outcome.is_complete());
        assert!(!paths[0].is_active);
    }

    #[test]
    fn test_multi_termination_end_is_split() {
        let mut fx = Fixture::new();
        let a = fx.interface(1);
        let b = fx.interface(2);
        let c = fx.interface(3);
        fx.cable(&[a], &[b, c], CableStatus::Connected);

        let paths = fx.trace(a);
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0].segments, paths[1].segments);
        assert_eq!(paths[0].outcome, PathOutcome::Split { termination: b, count: 2 });
        assert_eq!(paths[1].outcome, PathOutcome::Split { termination: c, count: 2 });
        assert!(paths.iter().all(|p| p.is_active));
    }

    #[test]
    fn test_fan_out_at_multi_position_rear_port() {
        let mut fx = Fixture::new();
        let src = fx.interface(1);
        let rear = fx.rear(1, 3);
        fx.cable(&[src], &[rear], CableStatus::Connected);
        for pos in 1..=3u16 {
            let front = fx.front(u64::from(pos), 1, pos);
            let dst = fx.interface(10 + u64::from(pos));
            let status = if pos == 2 { CableStatus::Planned } else { CableStatus::Connected };
            fx.cable(&[front], &[dst], status);
        }

        let paths = fx.trace(src);
        assert_eq!(paths.len(), 3);
        let endpoints: Vec<_> = paths.iter().filter_map(|p| p.outcome.endpoint()).collect();
        assert_eq!(
            endpoints,
            vec![
                TerminationRef::interface(11),
                TerminationRef::interface(12),
                TerminationRef::interface(13)
            ]
        );
        let active: Vec<_> = paths.iter().map(|p| p.is_active).collect();
        assert_eq!(active, vec![true, false, true]);
    }

    #[test]
    fn test_trunk_cable_preserves_position() {
        // eth1 - front1 (pos 2 of rear1) | rear1 === rear2 | front at pos 2 of rear2 - eth2
        let mut fx = Fixture::new();
        let eth1 = fx.interface(1);
        let eth2 = fx.interface(2);
        let eth3 = fx.interface(3);
        let rear1 = fx.rear(1, 2);
        let rear2 = fx.rear(2, 2);
        let _f11 = fx.front(11, 1, 1);
        let f12 = fx.front(12, 1, 2);
        let f21 = fx.front(21, 2, 1);
        let f22 = fx.front(22, 2, 2);
        fx.cable(&[eth1], &[f12], CableStatus::Connected);
        let trunk = fx.cable(&[rear1], &[rear2], CableStatus::Connected);
        fx.cable(&[f22], &[eth2], CableStatus::Connected);
        fx.cable(&[f21], &[eth3], CableStatus::Connected);

        let paths = fx.trace(eth1);
        assert_eq!(paths.len(), 1, "position stack must prevent fan-out");
        assert_eq!(paths[0].outcome, PathOutcome::Endpoint { termination: eth2 });
        assert!(paths[0].segments.contains(&PathSegment::Cable { cable: trunk }));
        assert!(paths[0]
            .segments
            .contains(&PathSegment::PassThrough { from: rear2, to: f22 }));
    }

    #[test]
    fn test_loop_through_ring_of_panels() {
        // rear1 - front2 | rear2 - front1 | rear1 ...
        let mut fx = Fixture::new();
        let rear1 = fx.rear(1, 1);
        let rear2 = fx.rear(2, 1);
        let front1 = fx.front(1, 1, 1);
        let front2 = fx.front(2, 2, 1);
        let c1 = fx.cable(&[rear1], &[front2], CableStatus::Connected);
        fx.cable(&[rear2], &[front1], CableStatus::Connected);

        let paths = fx.trace(rear1);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].outcome, PathOutcome::Loop { cable: c1 });
        assert!(!paths[0].is_active);
    }

    #[test]
    fn test_unmapped_front_port_is_dead_end() {
        let mut fx = Fixture::new();
        let eth = fx.interface(1);
        fx.rear(1, 1);
        let front = fx.front(1, 1, 1);
        fx.cable(&[eth], &[front], CableStatus::Connected);
        fx.registry.remove(TerminationRef::rear_port(1)).unwrap();

        let paths = fx.trace(eth);
        assert_eq!(paths.len(), 1);
        assert_eq!(
            paths[0].outcome,
            PathOutcome::DeadEnd {
                reason: DeadEndReason::Unmapped { port: front }
            }
        );
        assert_eq!(paths[0].cable_count(), 1);
        assert!(!paths[0].is_active);
    }

    #[test]
    fn test_dangling_pass_through_is_dead_end() {
        let mut fx = Fixture::new();
        let eth = fx.interface(1);
        let rear = fx.rear(1, 1);
        let front = fx.front(1, 1, 1);
        fx.cable(&[eth], &[rear], CableStatus::Connected);

        let paths = fx.trace(eth);
        assert_eq!(
            paths[0].outcome,
            PathOutcome::DeadEnd {
                reason: DeadEndReason::NoCable { at: front }
            }
        );
    }

    #[test]
    fn test_far_side_splits_between_endpoint_and_panel() {
        let mut fx = Fixture::new();
        let i1 = fx.interface(1);
        let i2 = fx.interface(2);
        let i3 = fx.interface(3);
        let rear = fx.rear(1, 1);
        let front = fx.front(1, 1, 1);
        fx.cable(&[i1], &[i2, front], CableStatus::Connected);
        fx.cable(&[rear], &[i3], CableStatus::Connected);

        let outcomes: Vec<_> = fx.trace(i1).into_iter().map(|p| p.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                PathOutcome::Endpoint { termination: i2 },
                PathOutcome::Endpoint { termination: i3 },
            ]
        );

        fx.registry.remove(rear).unwrap();
        let outcomes: Vec<_> = fx.trace(i1).into_iter().map(|p| p.outcome).collect();
        assert_eq!(
            outcomes[1],
            PathOutcome::DeadEnd {
                reason: DeadEndReason::Unmapped { port: front }
            }
        );
    }

    #[test]
    fn test_unknown_start_is_not_found() {
        let fx = Fixture::new();
        let err = PathTracer::new(&fx.registry, &fx.cables)
            .trace(TerminationRef::new(TerminationKind::PowerOutlet, 1))
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
