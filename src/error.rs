//! Error types for campus analysis.
//!
//! Room-level failures are values, not aborts: an [`AnalysisError`] is
//! always tagged with the room it belongs to and gets folded into the
//! enclosing building aggregate. Only [`OrchestratorError`] surfaces to the
//! caller of an analysis or simulation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by an insight generator backend.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneratorError {
    #[error("insight generator timed out after {0:?}")]
    Timeout(Duration),

    #[error("insight generator unavailable: {0}")]
    Unavailable(String),

    #[error("malformed insight response: {0}")]
    MalformedResponse(String),
}

/// Coarse classification of a room failure, kept in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidConfig,
    Timeout,
    Unavailable,
    MalformedResponse,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidConfig => write!(f, "Invalid config"),
            FailureKind::Timeout => write!(f, "Timeout"),
            FailureKind::Unavailable => write!(f, "Unavailable"),
            FailureKind::MalformedResponse => write!(f, "Malformed response"),
            FailureKind::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A room analysis that did not produce an insight.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("room {room_id}: invalid configuration: {reason}")]
    InvalidConfig { room_id: String, reason: String },

    #[error("room {room_id}: insight generator timed out after {elapsed:?}")]
    Timeout { room_id: String, elapsed: Duration },

    #[error("room {room_id}: insight generator unavailable: {reason}")]
    Unavailable { room_id: String, reason: String },

    #[error("room {room_id}: malformed insight response: {reason}")]
    MalformedResponse { room_id: String, reason: String },

    #[error("room {room_id}: cancelled at analysis deadline")]
    Cancelled { room_id: String },
}

impl AnalysisError {
    /// Tag a generator failure with the room it happened for.
    pub fn from_generator(room_id: &str, err: GeneratorError) -> Self {
        let room_id = room_id.to_string();
        match err {
            GeneratorError::Timeout(elapsed) => AnalysisError::Timeout { room_id, elapsed },
            GeneratorError::Unavailable(reason) => AnalysisError::Unavailable { room_id, reason },
            GeneratorError::MalformedResponse(reason) => {
                AnalysisError::MalformedResponse { room_id, reason }
            }
        }
    }

    pub fn room_id(&self) -> &str {
        match self {
            AnalysisError::InvalidConfig { room_id, .. }
            | AnalysisError::Timeout { room_id, .. }
            | AnalysisError::Unavailable { room_id, .. }
            | AnalysisError::MalformedResponse { room_id, .. }
            | AnalysisError::Cancelled { room_id } => room_id,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            AnalysisError::InvalidConfig { .. } => FailureKind::InvalidConfig,
            AnalysisError::Timeout { .. } => FailureKind::Timeout,
            AnalysisError::Unavailable { .. } => FailureKind::Unavailable,
            AnalysisError::MalformedResponse { .. } => FailureKind::MalformedResponse,
            AnalysisError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }
}

/// Structural problem with a single building.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildingError {
    #[error("building {0} has no registered rooms")]
    NoRooms(String),
}

/// Errors that abort a whole analysis, simulation or comparison call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("campus snapshot contains no rooms")]
    EmptyCampus,

    #[error("invalid budget policy: {0}")]
    InvalidBudget(String),

    #[error("structural error: {0}")]
    Structural(String),

    #[error("invalid scenario '{name}': {reason}")]
    InvalidScenario { name: String, reason: String },
}

impl From<BuildingError> for OrchestratorError {
    fn from(err: BuildingError) -> Self {
        OrchestratorError::Structural(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
