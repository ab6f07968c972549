//! Errors raised by route edits and plan construction.

use thiserror::Error;

/// Error type for route plan operations.
///
/// Edit errors leave the plan untouched, so an optimizer can discard the
/// attempted move and carry on. Construction errors mean no plan exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("position {position} is out of range for vehicle {vehicle} (valid: 0..={len})")]
    InvalidPosition {
        vehicle: String,
        position: usize,
        len: usize,
    },
    #[error("visit {0} is already assigned to a vehicle")]
    AlreadyAssigned(String),
    #[error("visit {0} is not assigned to any vehicle")]
    NotAssigned(String),
    #[error("visit {visit} has malformed pairing with {paired}")]
    MalformedPairing { visit: String, paired: String },
    #[error("unknown visit {0}")]
    UnknownVisit(String),
    #[error("unknown vehicle {0}")]
    UnknownVehicle(String),
    #[error("duplicate id {0}")]
    DuplicateId(String),
}

impl PlanError {
    /// Returns true for errors an optimizer may swallow by dropping the move.
    ///
    /// ```
    /// use dial_a_ride::error::PlanError;
    ///
    /// assert!(PlanError::NotAssigned("v1".into()).is_recoverable());
    /// assert!(!PlanError::DuplicateId("v1".into()).is_recoverable());
    /// ```
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            PlanError::MalformedPairing { .. } | PlanError::DuplicateId(_)
        )
    }
}
