//! Core error types for cadence-core.
//!
//! Every engine operation returns one of these as a typed result. A
//! `NotFound` is never turned into "fall back to the template" and a
//! `StructuralInvariantViolation` is never swallowed.

use std::path::PathBuf;
use thiserror::Error;

use crate::program::EnrollmentStatus;

/// Core error type for cadence-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Day or week index outside the program bounds.
    #[error("{kind} index {index} out of range 1..={max}")]
    OutOfRange {
        kind: IndexKind,
        index: u32,
        max: u32,
    },

    /// Unknown program, cohort, enrollment, module or week.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: EntityKind, id: String },

    /// An active enrollment is missing the timestamp its day index needs.
    #[error("enrollment '{enrollment_id}' is inconsistent: {reason}")]
    InconsistentEnrollment {
        enrollment_id: String,
        reason: String,
    },

    /// A focus list operation would exceed the list capacity.
    #[error("focus list is full ({len}/{capacity})")]
    CapacityExceeded { capacity: u32, len: u32 },

    /// A reindex would leave gaps or overlaps in the day partition.
    #[error("structural invariant violated for program '{program_id}': {message}")]
    StructuralInvariantViolation { program_id: String, message: String },

    /// Another structural edit for the same program is in flight.
    #[error("a structural edit for program '{program_id}' is already in progress")]
    StructuralEditInProgress { program_id: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Illegal enrollment status transition
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failure reported by a store collaborator
    #[error("Store error: {0}")]
    Store(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub fn not_found(entity: EntityKind, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn structural(program_id: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::StructuralInvariantViolation {
            program_id: program_id.into(),
            message: message.into(),
        }
    }
}

/// Which index an `OutOfRange` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Day,
    Week,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Day => write!(f, "day"),
            IndexKind::Week => write!(f, "week"),
        }
    }
}

/// Which entity a `NotFound` error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Program,
    Cohort,
    Enrollment,
    Module,
    Week,
    Task,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Program => "program",
            EntityKind::Cohort => "cohort",
            EntityKind::Enrollment => "enrollment",
            EntityKind::Module => "module",
            EntityKind::Week => "week",
            EntityKind::Task => "task",
        };
        f.write_str(name)
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Home/config directory could not be determined
    #[error("could not determine configuration directory")]
    NoConfigDir,
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// A task is already present in the other focus list
    #[error("task '{task_id}' is already in the {list} list")]
    DuplicateTask { task_id: String, list: String },

    /// Reorder input was not a permutation of the list
    #[error("reorder of {list} list is not a permutation of its {len} tasks")]
    NotAPermutation { list: String, len: usize },
}

/// Illegal enrollment status change.
#[derive(Error, Debug, PartialEq, Eq)]
#[error("cannot move enrollment from {from:?} to {to:?}")]
pub struct TransitionError {
    pub from: EnrollmentStatus,
    pub to: EnrollmentStatus,
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
