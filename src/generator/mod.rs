//! Insight generator backends.
//!
//! The orchestrator treats per-room metric computation as a black box
//! behind [`InsightGenerator`]. Two backends ship with the crate: a
//! deterministic rule engine and an Ollama-hosted generative model.

pub mod ollama;
pub mod rules;

pub use ollama::{OllamaConfig, OllamaGenerator};
pub use rules::RuleBasedGenerator;

use crate::error::GeneratorError;
use crate::models::{RoomMetrics, RoomObservation};
use async_trait::async_trait;

/// Capability that turns one room observation into resource estimates.
///
/// Implementations may be slow, rate limited or nondeterministic; callers
/// bound them with their own timeouts and concurrency limits.
#[async_trait]
pub trait InsightGenerator: Send + Sync {
    /// Short backend name recorded in execution metadata.
    fn name(&self) -> &str;

    /// Produce metrics for a room whose capacity is positive and whose
    /// occupancy has already been clamped to capacity.
    async fn generate(&self, room: &RoomObservation) -> Result<RoomMetrics, GeneratorError>;
}
