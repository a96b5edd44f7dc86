// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error taxonomy for the topology stores and the tracer

use crate::types::{CableId, TerminationId, TerminationRef};
use thiserror::Error;

/// Errors raised by topology reads and mutations
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The referenced termination does not exist
    #[error("termination {0} not found")]
    TerminationNotFound(TerminationRef),

    /// The referenced cable does not exist
    #[error("cable #{0} not found")]
    CableNotFound(CableId),

    /// A termination is already attached to another cable
    #[error("termination {termination} is already attached to cable #{cable}")]
    DuplicateTermination {
        /// The termination that is already cabled
        termination: TerminationRef,
        /// The cable holding it
        cable: CableId,
    },

    /// Structurally invalid cable endpoints
    #[error("invalid termination: {0}")]
    InvalidTermination(String),

    /// A pass-through port without a configured peer
    #[error("pass-through port {0} has no mapped peer")]
    UnmappedPassThrough(TerminationRef),

    /// A front port claims a rear port position that is already taken
    #[error("position {position} of rear-port:{rear_port} is already claimed by {claimed_by}")]
    PositionConflict {
        /// Rear port id
        rear_port: TerminationId,
        /// Position requested
        position: u16,
        /// Front port already holding it
        claimed_by: TerminationRef,
    },

    /// Shrinking a rear port would orphan a mapped front port
    #[error(
        "rear-port:{rear_port} cannot drop to {requested} position(s): {front_port} is mapped to position {position}"
    )]
    PositionsInUse {
        /// Rear port id
        rear_port: TerminationId,
        /// Requested position count
        requested: u16,
        /// Front port that would be orphaned
        front_port: TerminationRef,
        /// Its position
        position: u16,
    },

    /// Invalid port definition (positions out of range, kind mismatch)
    #[error("invalid port definition: {0}")]
    InvalidPort(String),

    /// A termination with this reference is already registered
    #[error("termination {0} already exists")]
    TerminationExists(TerminationRef),

    /// Invalid cable attributes
    #[error("invalid cable: {0}")]
    InvalidCable(String),

    /// Unparseable `kind:id` reference
    #[error("invalid termination reference '{0}' (expected <kind>:<id>, e.g. interface:12)")]
    InvalidReference(String),

    /// Reading or writing the backing store failed
    #[error("storage error: {context}")]
    Storage {
        /// What was being done
        context: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The persisted topology could not be (de)serialized
    #[error("failed to (de)serialize topology: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A writer panicked while holding the topology lock
    #[error("topology lock poisoned")]
    Poisoned,
}

impl TopologyError {
    /// Whether this is one of the not-found errors
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TerminationNotFound(_) | Self::CableNotFound(_))
    }
}

/// Result alias for topology operations
pub type Result<T> = std::result::Result<T, TopologyError>;
