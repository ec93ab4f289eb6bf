//! EcoAgent - campus energy analysis and what-if simulation.
//!
//! Room observations are turned into resource estimates by an
//! [`InsightGenerator`], rolled up per building and campus-wide by the
//! [`CampusOrchestrator`], and compared across operational scenarios.
//!
//! ```no_run
//! use ecoagent::{BudgetPolicy, CampusOrchestrator, OrchestratorConfig, RuleBasedGenerator};
//! use std::sync::Arc;
//!
//! # async fn run(snapshot: ecoagent::CampusSnapshot) -> ecoagent::Result<()> {
//! let orchestrator =
//!     CampusOrchestrator::new(Arc::new(RuleBasedGenerator::new()), OrchestratorConfig::default());
//! let insight = orchestrator.analyze(&snapshot, &BudgetPolicy::unbounded()).await?;
//! println!("{:.1} kW", insight.metrics.total_energy_kw);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod report;
pub mod scenario;
pub mod source;

pub use analysis::{CampusOrchestrator, OrchestratorConfig};
pub use error::{AnalysisError, BuildingError, FailureKind, GeneratorError, OrchestratorError, Result};
pub use generator::{InsightGenerator, OllamaGenerator, RuleBasedGenerator};
pub use models::{
    BudgetLevel, BudgetPolicy, BuildingInsight, CampusInsight, CampusSnapshot, ComparisonResult,
    RoomInsight, RoomMetrics, RoomObservation, RoomType, ScenarioRanking,
};
pub use scenario::{ScenarioKind, SimulationScenario};
