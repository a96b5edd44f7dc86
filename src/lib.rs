// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! Cabletrace library - cable path tracing for physical network topologies
//!
//! This crate resolves, for any cable-capable endpoint (console/power ports,
//! interfaces, front/rear ports, power feeds, circuit terminations), the
//! end-to-end path formed by chained cables and pass-through ports. Paths are
//! kept up to date incrementally: every cable or port mutation retraces only
//! the origins it can affect.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cable;
pub mod commands;
pub mod config;
pub mod database;
pub mod error;
pub mod passthrough;
pub mod paths;
pub mod registry;
pub mod topology;
pub mod trace;

/// Core data types shared by every store and the tracer
pub mod types {
    use crate::error::TopologyError;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use sha2::{Digest, Sha256};
    use std::collections::BTreeSet;
    use std::fmt;
    use std::str::FromStr;

    /// Identity of a termination within its kind
    pub type TerminationId = u64;

    /// Identity of a cable
    pub type CableId = u64;

    // =========================================================================
    // Terminations
    // =========================================================================

    /// Every kind of object a cable can attach to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum TerminationKind {
        /// Console port on a device
        ConsolePort,
        /// Console server port on a device
        ConsoleServerPort,
        /// Power inlet on a device
        PowerPort,
        /// Power outlet on a device or PDU
        PowerOutlet,
        /// Network interface
        Interface,
        /// Front (patch) port of a pass-through panel
        FrontPort,
        /// Rear (trunk) port of a pass-through panel
        RearPort,
        /// Power feed from a power panel
        PowerFeed,
        /// Termination of a provider circuit
        CircuitTermination,
    }

    impl TerminationKind {
        /// All termination kinds, in declaration order
        pub const ALL: [Self; 9] = [
            Self::ConsolePort,
            Self::ConsoleServerPort,
            Self::PowerPort,
            Self::PowerOutlet,
            Self::Interface,
            Self::FrontPort,
            Self::RearPort,
            Self::PowerFeed,
            Self::CircuitTermination,
        ];

        /// Get the short slug used in termination references
        #[must_use]
        pub fn slug(&self) -> &'static str {
            match self {
                Self::ConsolePort => "console-port",
                Self::ConsoleServerPort => "console-server-port",
                Self::PowerPort => "power-port",
                Self::PowerOutlet => "power-outlet",
                Self::Interface => "interface",
                Self::FrontPort => "front-port",
                Self::RearPort => "rear-port",
                Self::PowerFeed => "power-feed",
                Self::CircuitTermination => "circuit-termination",
            }
        }

        /// Parse a kind from its slug
        #[must_use]
        pub fn from_slug(slug: &str) -> Option<Self> {
            Self::ALL.into_iter().find(|k| k.slug() == slug)
        }

        /// Front and rear ports relay a path instead of terminating it
        #[must_use]
        pub fn is_pass_through(&self) -> bool {
            matches!(self, Self::FrontPort | Self::RearPort)
        }
    }

    impl fmt::Display for TerminationKind {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.slug())
        }
    }

    /// Reference to a termination, independent of its concrete entity type
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub struct TerminationRef {
        /// What kind of termination this is
        pub kind: TerminationKind,
        /// Identity within the kind
        pub id: TerminationId,
    }

    impl TerminationRef {
        /// Build a reference from its parts
        #[must_use]
        pub const fn new(kind: TerminationKind, id: TerminationId) -> Self {
            Self { kind, id }
        }

        /// Shorthand for an interface reference
        #[must_use]
        pub const fn interface(id: TerminationId) -> Self {
            Self::new(TerminationKind::Interface, id)
        }

        /// Shorthand for a front port reference
        #[must_use]
        pub const fn front_port(id: TerminationId) -> Self {
            Self::new(TerminationKind::FrontPort, id)
        }

        /// Shorthand for a rear port reference
        #[must_use]
        pub const fn rear_port(id: TerminationId) -> Self {
            Self::new(TerminationKind::RearPort, id)
        }

        /// Whether this termination relays paths (front/rear port)
        #[must_use]
        pub fn is_pass_through(&self) -> bool {
            self.kind.is_pass_through()
        }
    }

    impl fmt::Display for TerminationRef {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}:{}", self.kind.slug(), self.id)
        }
    }

    impl FromStr for TerminationRef {
        type Err = TopologyError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            let (kind, id) = s
                .trim()
                .split_once(':')
                .ok_or_else(|| TopologyError::InvalidReference(s.to_string()))?;
            let kind = TerminationKind::from_slug(kind)
                .ok_or_else(|| TopologyError::InvalidReference(s.to_string()))?;
            let id = id
                .parse()
                .map_err(|_| TopologyError::InvalidReference(s.to_string()))?;
            Ok(Self::new(kind, id))
        }
    }

    // =========================================================================
    // Cables
    // =========================================================================

    /// Lifecycle status of a cable
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum CableStatus {
        /// Installed and carrying signal
        #[default]
        Connected,
        /// Not yet installed
        Planned,
        /// Scheduled for removal
        Decommissioning,
    }

    impl fmt::Display for CableStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Connected => "connected",
                Self::Planned => "planned",
                Self::Decommissioning => "decommissioning",
            })
        }
    }

    impl FromStr for CableStatus {
        type Err = TopologyError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "connected" => Ok(Self::Connected),
                "planned" => Ok(Self::Planned),
                "decommissioning" => Ok(Self::Decommissioning),
                other => Err(TopologyError::InvalidCable(format!(
                    "unknown status '{other}' (valid: connected, planned, decommissioning)"
                ))),
            }
        }
    }

    /// Which end of a cable a termination sits on
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum CableEnd {
        /// The A side
        A,
        /// The B side
        B,
    }

    impl CableEnd {
        /// The other end
        #[must_use]
        pub fn opposite(self) -> Self {
            match self {
                Self::A => Self::B,
                Self::B => Self::A,
            }
        }
    }

    /// Unit for a cable's physical length
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub enum LengthUnit {
        /// Kilometers
        #[serde(rename = "km")]
        Kilometer,
        /// Meters
        #[serde(rename = "m")]
        Meter,
        /// Centimeters
        #[serde(rename = "cm")]
        Centimeter,
        /// Miles
        #[serde(rename = "mi")]
        Mile,
        /// Feet
        #[serde(rename = "ft")]
        Foot,
        /// Inches
        #[serde(rename = "in")]
        Inch,
    }

    impl LengthUnit {
        /// Short code for this unit
        #[must_use]
        pub fn code(&self) -> &'static str {
            match self {
                Self::Kilometer => "km",
                Self::Meter => "m",
                Self::Centimeter => "cm",
                Self::Mile => "mi",
                Self::Foot => "ft",
                Self::Inch => "in",
            }
        }

        /// Convert a length in this unit to meters
        #[must_use]
        pub fn to_meters(&self, length: f64) -> f64 {
            match self {
                Self::Kilometer => length * 1000.0,
                Self::Meter => length,
                Self::Centimeter => length / 100.0,
                Self::Mile => length * 1609.344,
                Self::Foot => length * 0.3048,
                Self::Inch => length * 0.0254,
            }
        }
    }

    impl FromStr for LengthUnit {
        type Err = TopologyError;

        fn from_str(s: &str) -> Result<Self, Self::Err> {
            match s {
                "km" => Ok(Self::Kilometer),
                "m" => Ok(Self::Meter),
                "cm" => Ok(Self::Centimeter),
                "mi" => Ok(Self::Mile),
                "ft" => Ok(Self::Foot),
                "in" => Ok(Self::Inch),
                other => Err(TopologyError::InvalidCable(format!(
                    "unknown length unit '{other}' (valid: km, m, cm, mi, ft, in)"
                ))),
            }
        }
    }

    /// Physical attributes of a cable; none of these affect path computation
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    pub struct CableAttrs {
        /// Cable type (e.g. "cat6", "smf")
        #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
        pub cable_type: Option<String>,
        /// Human-readable label
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub label: Option<String>,
        /// Color as six hex digits
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub color: Option<String>,
        /// Physical length, in `length_unit`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub length: Option<f64>,
        /// Unit for `length`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub length_unit: Option<LengthUnit>,
    }

    impl CableAttrs {
        /// Check attribute consistency
        pub fn validate(&self) -> Result<(), TopologyError> {
            if let Some(length) = self.length {
                if !length.is_finite() || length < 0.0 {
                    return Err(TopologyError::InvalidCable(format!(
                        "length must be a non-negative number, got {length}"
                    )));
                }
                if self.length_unit.is_none() {
                    return Err(TopologyError::InvalidCable(
                        "must specify a unit when setting a cable length".into(),
                    ));
                }
            }
            if let Some(color) = &self.color {
                if color.len() != 6 || !color.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(TopologyError::InvalidCable(format!(
                        "color must be six hex digits, got '{color}'"
                    )));
                }
            }
            Ok(())
        }

        /// Length normalized to meters, if both length and unit are set
        #[must_use]
        pub fn length_meters(&self) -> Option<f64> {
            match (self.length, self.length_unit) {
                (Some(length), Some(unit)) => Some(unit.to_meters(length)),
                _ => None,
            }
        }
    }

    /// A single physical link between two sets of terminations
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Cable {
        /// Unique identifier
        pub id: CableId,
        /// Terminations on the A side (sorted, non-empty)
        pub a_terminations: Vec<TerminationRef>,
        /// Terminations on the B side (sorted, non-empty)
        pub b_terminations: Vec<TerminationRef>,
        /// Lifecycle status
        pub status: CableStatus,
        /// Physical attributes
        #[serde(flatten)]
        pub attrs: CableAttrs,
        /// When the cable was created
        pub created_at: DateTime<Utc>,
        /// When the cable was last changed
        pub updated_at: DateTime<Utc>,
    }

    impl Cable {
        /// Terminations on one end
        #[must_use]
        pub fn side(&self, end: CableEnd) -> &[TerminationRef] {
            match end {
                CableEnd::A => &self.a_terminations,
                CableEnd::B => &self.b_terminations,
            }
        }

        /// Which end holds the given termination
        #[must_use]
        pub fn end_of(&self, termination: &TerminationRef) -> Option<CableEnd> {
            if self.a_terminations.contains(termination) {
                Some(CableEnd::A)
            } else if self.b_terminations.contains(termination) {
                Some(CableEnd::B)
            } else {
                None
            }
        }

        /// Terminations on the end opposite to the given termination
        #[must_use]
        pub fn far_side(&self, termination: &TerminationRef) -> Option<&[TerminationRef]> {
            self.end_of(termination).map(|end| self.side(end.opposite()))
        }

        /// All terminations, A side first
        pub fn terminations(&self) -> impl Iterator<Item = &TerminationRef> {
            self.a_terminations.iter().chain(self.b_terminations.iter())
        }

        /// Display name: the label if set, else `#<id>`
        #[must_use]
        pub fn display_name(&self) -> String {
            self.attrs
                .label
                .clone()
                .unwrap_or_else(|| format!("#{}", self.id))
        }
    }

    // =========================================================================
    // Paths
    // =========================================================================

    /// One hop of a traced path
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(tag = "segment", rename_all = "snake_case")]
    pub enum PathSegment {
        /// Traversal of a cable
        Cable {
            /// The cable crossed
            cable: CableId,
        },
        /// Traversal of the internal wiring of a patch panel
        PassThrough {
            /// Port the signal enters
            from: TerminationRef,
            /// Port the signal leaves
            to: TerminationRef,
        },
    }

    impl PathSegment {
        /// The cable crossed by this segment, if it is a cable segment
        #[must_use]
        pub fn cable_id(&self) -> Option<CableId> {
            match self {
                Self::Cable { cable } => Some(*cable),
                Self::PassThrough { .. } => None,
            }
        }

        /// The same hop walked in the opposite direction
        #[must_use]
        pub fn reversed(&self) -> Self {
            match self {
                Self::Cable { cable } => Self::Cable { cable: *cable },
                Self::PassThrough { from, to } => Self::PassThrough { from: *to, to: *from },
            }
        }
    }

    impl fmt::Display for PathSegment {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Cable { cable } => write!(f, "cable #{cable}"),
                Self::PassThrough { from, to } => write!(f, "{from} => {to}"),
            }
        }
    }

    /// Why a branch stopped short of an endpoint
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(tag = "reason", rename_all = "snake_case")]
    pub enum DeadEndReason {
        /// The termination reached has no cable attached
        NoCable {
            /// Where the trace stopped
            at: TerminationRef,
        },
        /// A pass-through port has no mapped peer
        Unmapped {
            /// The port with the missing mapping
            port: TerminationRef,
        },
        /// A cable whose far end holds no terminations
        OpenCable {
            /// The cable with the empty end
            cable: CableId,
        },
    }

    impl DeadEndReason {
        /// The termination at which the branch stopped, if any
        #[must_use]
        pub fn termination(&self) -> Option<TerminationRef> {
            match self {
                Self::NoCable { at } => Some(*at),
                Self::Unmapped { port } => Some(*port),
                Self::OpenCable { .. } => None,
            }
        }
    }

    impl fmt::Display for DeadEndReason {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::NoCable { at } => write!(f, "no cable attached at {at}"),
                Self::Unmapped { port } => write!(f, "pass-through port {port} has no mapped peer"),
                Self::OpenCable { cable } => write!(f, "cable #{cable} has an empty far end"),
            }
        }
    }

    /// Terminal outcome of one path branch
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(tag = "outcome", rename_all = "snake_case")]
    pub enum PathOutcome {
        /// The branch reached a non-pass-through termination
        Endpoint {
            /// The termination reached
            termination: TerminationRef,
        },
        /// The branch reached one of several endpoints fed by the same cable end
        Split {
            /// The termination reached by this branch
            termination: TerminationRef,
            /// How many endpoints share the cable end
            count: usize,
        },
        /// The branch stopped short of an endpoint
        DeadEnd {
            /// Why it stopped
            reason: DeadEndReason,
        },
        /// The branch re-entered a cable it had already crossed
        Loop {
            /// The cable seen twice
            cable: CableId,
        },
    }

    impl PathOutcome {
        /// The endpoint reached, if any
        #[must_use]
        pub fn endpoint(&self) -> Option<TerminationRef> {
            match self {
                Self::Endpoint { termination } | Self::Split { termination, .. } => Some(*termination),
                Self::DeadEnd { .. } | Self::Loop { .. } => None,
            }
        }

        /// Whether the branch reached an endpoint
        #[must_use]
        pub fn is_complete(&self) -> bool {
            self.endpoint().is_some()
        }

        /// Whether the branch ended in a loop
        #[must_use]
        pub fn is_loop(&self) -> bool {
            matches!(self, Self::Loop { .. })
        }
    }

    impl fmt::Display for PathOutcome {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::Endpoint { termination } => write!(f, "reaches {termination}"),
                Self::Split { termination, count } => {
                    write!(f, "reaches {termination} (split 1 of {count})")
                }
                Self::DeadEnd { reason } => write!(f, "dead end: {reason}"),
                Self::Loop { cable } => write!(f, "loop at cable #{cable}"),
            }
        }
    }

    /// Content-derived identity of a path
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct PathId(pub String);

    impl fmt::Display for PathId {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    /// A resolved path branch
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Path {
        /// Deterministic hash of segments and outcome
        pub id: PathId,
        /// Ordered cable and pass-through hops
        pub segments: Vec<PathSegment>,
        /// How the branch ended
        pub outcome: PathOutcome,
        /// True iff the branch reached an endpoint over only connected cables
        pub is_active: bool,
        /// Terminations whose trace yields this exact branch
        #[serde(default)]
        pub origins: BTreeSet<TerminationRef>,
    }

    impl Path {
        /// Build a path; its id is derived from the content
        #[must_use]
        pub fn new(segments: Vec<PathSegment>, outcome: PathOutcome, is_active: bool) -> Self {
            let id = Self::fingerprint(&segments, &outcome);
            Self {
                id,
                segments,
                outcome,
                is_active,
                origins: BTreeSet::new(),
            }
        }

        /// Generate the deterministic ID for a segment list and outcome
        #[must_use]
        pub fn fingerprint(segments: &[PathSegment], outcome: &PathOutcome) -> PathId {
            let mut hasher = Sha256::new();
            for segment in segments {
                hasher.update(segment.to_string().as_bytes());
                hasher.update(b";");
            }
            hasher.update(outcome.to_string().as_bytes());
            let hash = hex::encode(hasher.finalize());
            PathId(format!("path:{}", &hash[..12]))
        }

        /// Cables crossed, in order
        pub fn cable_ids(&self) -> impl Iterator<Item = CableId> + '_ {
            self.segments.iter().filter_map(PathSegment::cable_id)
        }

        /// Number of cable segments
        #[must_use]
        pub fn cable_count(&self) -> usize {
            self.cable_ids().count()
        }

        /// Whether the path crosses the given cable
        #[must_use]
        pub fn contains_cable(&self, cable: CableId) -> bool {
            self.cable_ids().any(|c| c == cable)
        }

        /// Terminations named by the path (pass-through hops and where it ended)
        #[must_use]
        pub fn terminations(&self) -> BTreeSet<TerminationRef> {
            let mut terms = BTreeSet::new();
            for segment in &self.segments {
                if let PathSegment::PassThrough { from, to } = segment {
                    terms.insert(*from);
                    terms.insert(*to);
                }
            }
            match &self.outcome {
                PathOutcome::Endpoint { termination } | PathOutcome::Split { termination, .. } => {
                    terms.insert(*termination);
                }
                PathOutcome::DeadEnd { reason } => {
                    if let Some(t) = reason.termination() {
                        terms.insert(t);
                    }
                }
                PathOutcome::Loop { .. } => {}
            }
            terms
        }

        /// Segments as walked from the far end back to the origin
        #[must_use]
        pub fn reversed_segments(&self) -> Vec<PathSegment> {
            self.segments.iter().rev().map(PathSegment::reversed).collect()
        }
    }

    /// Why a termination with a stored path is not fully connected
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum IncompleteReason {
        /// Every branch stopped short of an endpoint
        DeadEnd(DeadEndReason),
        /// A branch looped back onto a cable it already crossed
        Loop(CableId),
        /// An endpoint is reached, but over a cable that is not connected
        Inactive,
    }

    impl fmt::Display for IncompleteReason {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::DeadEnd(reason) => write!(f, "dead end: {reason}"),
                Self::Loop(cable) => write!(f, "loop detected at cable #{cable}"),
                Self::Inactive => f.write_str("path crosses a cable that is not connected"),
            }
        }
    }

    /// User-facing connectivity of a termination
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ConnectionStatus {
        /// No path on record
        NotConnected,
        /// At least one active branch reaches an endpoint
        Connected,
        /// A path exists but no branch is active
        Incomplete(IncompleteReason),
    }

    impl fmt::Display for ConnectionStatus {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Self::NotConnected => f.write_str("not connected"),
                Self::Connected => f.write_str("connected"),
                Self::Incomplete(reason) => write!(f, "incomplete ({reason})"),
            }
        }
    }

    /// Every branch traced from one origin
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Trace {
        /// Where the trace started
        pub origin: TerminationRef,
        /// One path per branch, in traversal order
        pub paths: Vec<Path>,
    }

    impl Trace {
        /// True iff at least one branch is active
        #[must_use]
        pub fn is_connected(&self) -> bool {
            self.paths.iter().any(|p| p.is_active)
        }

        /// True when the trace forked into more than one branch
        #[must_use]
        pub fn is_split(&self) -> bool {
            self.paths.len() > 1
        }

        /// Endpoints reached by any branch
        #[must_use]
        pub fn endpoints(&self) -> Vec<TerminationRef> {
            self.paths.iter().filter_map(|p| p.outcome.endpoint()).collect()
        }

        /// Summarize the trace for operators
        #[must_use]
        pub fn status(&self) -> ConnectionStatus {
            if self.is_connected() {
                return ConnectionStatus::Connected;
            }
            if self.paths.iter().all(|p| p.cable_count() == 0) {
                return ConnectionStatus::NotConnected;
            }
            // Loops first: they point at a miswired panel
            if let Some(cable) = self.paths.iter().find_map(|p| match p.outcome {
                PathOutcome::Loop { cable } => Some(cable),
                _ => None,
            }) {
                return ConnectionStatus::Incomplete(IncompleteReason::Loop(cable));
            }
            if self.paths.iter().any(|p| p.outcome.is_complete()) {
                return ConnectionStatus::Incomplete(IncompleteReason::Inactive);
            }
            match self.paths.iter().find_map(|p| match &p.outcome {
                PathOutcome::DeadEnd { reason } => Some(reason.clone()),
                _ => None,
            }) {
                Some(reason) => ConnectionStatus::Incomplete(IncompleteReason::DeadEnd(reason)),
                None => ConnectionStatus::NotConnected,
            }
        }
    }
}

/// Prelude for common imports
pub mod prelude {
    pub use crate::database::TopologyDb;
    pub use crate::error::{Result, TopologyError};
    pub use crate::topology::Topology;
    pub use crate::types::*;
}
