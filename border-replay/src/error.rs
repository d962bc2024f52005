//! Errors in the library.
use crate::Eid;
use thiserror::Error;

/// Errors in the library.
///
/// Every fallible operation validates its whole input before touching any state,
/// so an `Err` never leaves a partially applied batch behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplayError {
    /// Invalid construction parameter.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The eid was evicted or has never been issued.
    #[error("Lookup error: eid {0} is not mapped to any slot")]
    Lookup(Eid),

    /// The slot is out of range or has never been written.
    #[error("Index error: slot {idx} is not readable (capacity {capacity})")]
    Index {
        /// Requested slot.
        idx: usize,

        /// Capacity of the structure.
        capacity: usize,
    },

    /// The caller passed a value the contract forbids.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Parallel arrays differ in length.
    #[error("Shape error: {name} has length {actual}, expected {expected}")]
    Shape {
        /// Name of the offending argument.
        name: &'static str,

        /// Expected length.
        expected: usize,

        /// Actual length.
        actual: usize,
    },

    /// Sampling from an empty buffer.
    #[error("Cannot sample from an empty buffer")]
    Empty,
}

/// Result type of the library.
pub type Result<T> = std::result::Result<T, ReplayError>;
