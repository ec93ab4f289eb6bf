//! Analysis pipeline.
//!
//! Rooms are analyzed by [`RoomAnalyzer`], grouped per building by
//! [`BuildingAnalyzer`] and rolled up campus-wide by [`CampusOrchestrator`].
//! The sampler and the scenario transformer are plain functions.

pub mod aggregator;
pub mod building;
pub mod orchestrator;
pub mod room;
pub mod sampler;
pub mod transformer;

pub use building::BuildingAnalyzer;
pub use orchestrator::{CampusOrchestrator, OrchestratorConfig};
pub use room::RoomAnalyzer;
pub use sampler::Selection;
