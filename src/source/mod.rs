//! Observation sources.
//!
//! Loads campus snapshots and scenario files from disk and applies the
//! environmental overlay. Everything here runs upstream of the
//! orchestrator, which only ever reads the final snapshot.

pub mod overlay;
pub mod snapshot;

pub use overlay::EnvironmentOverlay;
pub use snapshot::{load_scenarios, load_snapshot};
