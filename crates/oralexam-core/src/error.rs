//! Library error types.
//!
//! Illegal phase transitions and malformed qualitative input are not errors;
//! the variants here cover lookups and phase preconditions in the session
//! layer and invalid scoring configuration.

use thiserror::Error;
use uuid::Uuid;

use crate::state_machine::ExamPhase;

/// Errors raised by the session orchestrator.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No live session exists with this id.
    #[error("session not found: {0}")]
    NotFound(Uuid),

    /// The operation is only allowed in another phase.
    #[error("session {session_id} is in phase {actual}, expected {expected}")]
    WrongPhase {
        session_id: Uuid,
        expected: ExamPhase,
        actual: ExamPhase,
    },
}

/// Errors in a scoring configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The level band table must have one threshold per level step.
    #[error("expected {expected} level thresholds, found {found}")]
    ThresholdCount { expected: usize, found: usize },

    /// Level thresholds must be strictly ascending.
    #[error("level thresholds must be strictly ascending (at index {index})")]
    ThresholdOrder { index: usize },

    /// Level thresholds must be finite.
    #[error("level threshold at index {index} is not finite: {value}")]
    NonFiniteThreshold { index: usize, value: f64 },

    /// The silence gap must be finite and non-negative.
    #[error("invalid silence gap {0} seconds")]
    InvalidSilenceGap(f64),

    /// Blend weights must be finite and non-negative.
    #[error("invalid blend weight {name} = {value}")]
    InvalidWeight { name: &'static str, value: f64 },
}
