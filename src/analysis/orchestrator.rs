//! Campus-wide analysis, simulation and comparison.

use super::aggregator::{
    campus_metrics, campus_recommendations, comparison_deltas, critical_buildings,
};
use super::building::BuildingAnalyzer;
use super::room::RoomAnalyzer;
use super::{sampler, transformer};
use crate::error::{FailureKind, OrchestratorError, Result};
use crate::generator::InsightGenerator;
use crate::models::{
    BudgetPolicy, BuildingInsight, CampusInsight, CampusSnapshot, ComparisonResult,
    ExecutionMetadata, ScenarioRanking,
};
use crate::scenario::SimulationScenario;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, info};

/// Tuning for one orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Buildings analyzed at once.
    pub building_concurrency: usize,
    /// Rooms analyzed at once within one building.
    pub room_concurrency: usize,
    /// Generator calls in flight at once across the whole call.
    pub max_in_flight: usize,
    pub generator_timeout: Duration,
    /// Wall-clock limit for one analysis call.
    pub deadline: Option<Duration>,
    pub critical_energy_kw: f64,
    pub top_recommendations: usize,
    pub energy_price_per_kwh: f64,
    pub water_price_per_liter: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            building_concurrency: 4,
            room_concurrency: 8,
            max_in_flight: 16,
            generator_timeout: Duration::from_secs(30),
            deadline: None,
            critical_energy_kw: 50.0,
            top_recommendations: 3,
            energy_price_per_kwh: 0.12,
            water_price_per_liter: 0.002,
        }
    }
}

/// Entry point for analysis and what-if simulation.
///
/// Holds no state between calls; each call builds its own limiter and
/// analyzers, so concurrent calls share nothing but the generator.
pub struct CampusOrchestrator {
    generator: Arc<dyn InsightGenerator>,
    config: OrchestratorConfig,
}

impl CampusOrchestrator {
    pub fn new(generator: Arc<dyn InsightGenerator>, config: OrchestratorConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Analyze the budgeted subset of the campus.
    pub async fn analyze(
        &self,
        snapshot: &CampusSnapshot,
        policy: &BudgetPolicy,
    ) -> Result<CampusInsight> {
        let started = Instant::now();
        check_topology(snapshot)?;

        let budget = policy.effective();
        let selection = sampler::select(snapshot, budget)?;
        let deadline = self.config.deadline.map(|d| started + d);

        let limiter = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let rooms = RoomAnalyzer::new(
            Arc::clone(&self.generator),
            limiter,
            self.config.generator_timeout,
        );
        let analyzer = BuildingAnalyzer::new(
            rooms,
            self.config.room_concurrency,
            self.config.top_recommendations,
        );

        debug!(
            "Dispatching {} buildings (concurrency {})",
            selection.building_count(),
            self.config.building_concurrency
        );

        let analyzer = &analyzer;
        let results: Vec<_> = stream::iter(selection.buildings.iter())
            .map(|(building_id, rooms)| async move {
                let name = snapshot
                    .buildings
                    .get(*building_id)
                    .map(|info| info.name.as_str());
                analyzer.analyze(building_id, name, rooms, deadline).await
            })
            .buffer_unordered(self.config.building_concurrency.max(1))
            .collect()
            .await;

        let mut buildings = BTreeMap::new();
        for result in results {
            let insight = result?;
            buildings.insert(insight.building_id.clone(), insight);
        }

        let insight = self.assemble(snapshot, &selection, buildings, started);
        info!(
            "Analyzed {}/{} rooms in {} buildings in {}ms ({})",
            insight.execution.rooms_succeeded,
            insight.execution.rooms_attempted,
            insight.execution.buildings_analyzed,
            insight.execution.duration_ms,
            insight.execution.budget
        );
        Ok(insight)
    }

    fn assemble(
        &self,
        snapshot: &CampusSnapshot,
        selection: &sampler::Selection<'_>,
        buildings: BTreeMap<String, BuildingInsight>,
        started: Instant,
    ) -> CampusInsight {
        let ordered: Vec<&BuildingInsight> = buildings.values().collect();
        let metrics = campus_metrics(
            ordered.iter().copied(),
            self.config.energy_price_per_kwh,
            self.config.water_price_per_liter,
        );
        let critical = critical_buildings(ordered.iter().copied(), self.config.critical_energy_kw);
        let recommendations = campus_recommendations(&ordered, &metrics);

        let rooms_attempted = ordered.iter().map(|b| b.rooms_attempted).sum();
        let rooms_succeeded = ordered.iter().map(|b| b.rooms_succeeded).sum();
        let deadline_expired = ordered
            .iter()
            .flat_map(|b| &b.failures)
            .any(|f| f.kind == FailureKind::Cancelled);

        let execution = ExecutionMetadata {
            generator: self.generator.name().to_string(),
            buildings_total: snapshot.rooms_by_building().len(),
            rooms_total: snapshot.rooms.len(),
            buildings_analyzed: ordered.len(),
            rooms_attempted,
            rooms_succeeded,
            budget: selection.budget,
            budget_limited: selection.limited,
            deadline_expired,
            duration_ms: started.elapsed().as_millis() as u64,
        };

        CampusInsight {
            timestamp: Utc::now(),
            campus_name: snapshot.campus.name.clone(),
            buildings,
            metrics,
            critical_buildings: critical,
            recommendations,
            execution,
        }
    }

    /// Simulate one scenario against a freshly computed baseline.
    pub async fn simulate(
        &self,
        scenario: &SimulationScenario,
        snapshot: &CampusSnapshot,
        policy: &BudgetPolicy,
    ) -> Result<ComparisonResult> {
        transformer::validate(scenario, snapshot)?;
        let baseline = self.analyze(snapshot, policy).await?;
        self.simulate_against(&baseline, scenario, snapshot, policy)
            .await
    }

    /// Simulate one scenario against a baseline the caller already holds.
    ///
    /// The baseline must have been analyzed from `snapshot` under the same
    /// budget, otherwise the two runs would not sample the same rooms.
    pub async fn simulate_against(
        &self,
        baseline: &CampusInsight,
        scenario: &SimulationScenario,
        snapshot: &CampusSnapshot,
        policy: &BudgetPolicy,
    ) -> Result<ComparisonResult> {
        let budget = policy.effective();
        if !baseline.execution.budget.same_caps(&budget) {
            return Err(OrchestratorError::InvalidBudget(format!(
                "baseline was analyzed with ({}) but simulation requested ({})",
                baseline.execution.budget, budget
            )));
        }

        let modified_snapshot = transformer::apply(scenario, snapshot)?;
        let modified = self.analyze(&modified_snapshot, policy).await?;
        let deltas = comparison_deltas(baseline, &modified);

        info!(
            "Scenario '{}': {:.1}% energy savings ({:.2} kW)",
            scenario.name(),
            deltas.energy_savings_pct, deltas.energy_savings_kw
        );

        Ok(ComparisonResult {
            scenario: scenario.name().to_string(),
            scenario_kind: scenario.kind().clone(),
            baseline: baseline.clone(),
            modified,
            deltas,
        })
    }

    /// Simulate several scenarios and rank them by energy savings.
    ///
    /// All scenarios are validated before anything is analyzed, and the
    /// baseline is computed once. Equal savings keep their input order.
    pub async fn compare_many(
        &self,
        scenarios: &[SimulationScenario],
        snapshot: &CampusSnapshot,
        policy: &BudgetPolicy,
    ) -> Result<ScenarioRanking> {
        if scenarios.is_empty() {
            return Ok(ScenarioRanking {
                scenarios_compared: 0,
                results: Vec::new(),
                recommended: None,
            });
        }

        for scenario in scenarios {
            transformer::validate(scenario, snapshot)?;
        }

        let baseline = self.analyze(snapshot, policy).await?;
        let mut results = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            results.push(
                self.simulate_against(&baseline, scenario, snapshot, policy)
                    .await?,
            );
        }

        results.sort_by(|a, b| {
            b.deltas
                .energy_savings_pct
                .total_cmp(&a.deltas.energy_savings_pct)
        });
        let recommended = results.first().map(|r| r.scenario.clone());

        Ok(ScenarioRanking {
            scenarios_compared: scenarios.len(),
            results,
            recommended,
        })
    }
}

/// Reject snapshots whose topology cannot be analyzed.
fn check_topology(snapshot: &CampusSnapshot) -> Result<()> {
    if snapshot.rooms.is_empty() {
        return Err(OrchestratorError::EmptyCampus);
    }

    let mut seen = HashSet::new();
    for room in &snapshot.rooms {
        if !seen.insert(room.room_id.as_str()) {
            return Err(OrchestratorError::Structural(format!(
                "duplicate room id '{}'",
                room.room_id
            )));
        }
        if !snapshot.buildings.is_empty() && !snapshot.buildings.contains_key(&room.building_id) {
            return Err(OrchestratorError::Structural(format!(
                "room '{}' references unknown building '{}'",
                room.room_id, room.building_id
            )));
        }
    }

    let occupied: HashSet<&str> = snapshot.rooms.iter().map(|r| r.building_id.as_str()).collect();
    if let Some(empty) = snapshot
        .buildings
        .keys()
        .find(|id| !occupied.contains(id.as_str()))
    {
        return Err(OrchestratorError::Structural(format!(
            "building '{}' has no registered rooms",
            empty
        )));
    }

    Ok(())
}
