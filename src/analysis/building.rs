//! Building-level fan-out and aggregation.

use super::aggregator::{occupancy_rate, top_recommendations, weighted_savings};
use super::room::RoomAnalyzer;
use crate::error::{AnalysisError, BuildingError};
use crate::models::{BuildingInsight, RoomFailure, RoomInsight, RoomObservation};
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Analyzes every room of one building with bounded concurrency.
#[derive(Clone)]
pub struct BuildingAnalyzer {
    rooms: RoomAnalyzer,
    room_concurrency: usize,
    top_recommendations: usize,
}

impl BuildingAnalyzer {
    pub fn new(rooms: RoomAnalyzer, room_concurrency: usize, top_recommendations: usize) -> Self {
        Self {
            rooms,
            room_concurrency: room_concurrency.max(1),
            top_recommendations,
        }
    }

    /// Analyze the given rooms of `building_id`.
    ///
    /// Waits for every dispatched room, successful or not, before
    /// aggregating. Room failures never fail the building; only an empty
    /// room list does.
    pub async fn analyze(
        &self,
        building_id: &str,
        building_name: Option<&str>,
        rooms: &[&RoomObservation],
        deadline: Option<Instant>,
    ) -> Result<BuildingInsight, BuildingError> {
        if rooms.is_empty() {
            return Err(BuildingError::NoRooms(building_id.to_string()));
        }

        debug!(
            "Analyzing {} rooms in building {} (concurrency {})",
            rooms.len(),
            building_id,
            self.room_concurrency
        );

        let results: Vec<Result<RoomInsight, AnalysisError>> = stream::iter(rooms.iter().copied())
            .map(|room| self.rooms.analyze(room, deadline))
            .buffer_unordered(self.room_concurrency)
            .collect()
            .await;

        let insight = aggregate_building(
            building_id,
            building_name,
            results,
            self.top_recommendations,
        );

        if insight.rooms_succeeded < insight.rooms_attempted {
            warn!(
                "Building {}: {}/{} rooms analyzed",
                building_id, insight.rooms_succeeded, insight.rooms_attempted
            );
        }

        Ok(insight)
    }
}

/// Fold room results into a [`BuildingInsight`].
///
/// Failed rooms are excluded from every total but counted as attempted.
/// Rooms and failures come out sorted by room id whatever order the
/// results arrived in.
pub fn aggregate_building(
    building_id: &str,
    building_name: Option<&str>,
    results: Vec<Result<RoomInsight, AnalysisError>>,
    top_n: usize,
) -> BuildingInsight {
    let rooms_attempted = results.len();
    let mut rooms = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(insight) => rooms.push(insight),
            Err(err) => failures.push(RoomFailure {
                room_id: err.room_id().to_string(),
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }
    rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
    failures.sort_by(|a, b| a.room_id.cmp(&b.room_id));

    let total_energy_kw: f64 = rooms.iter().map(|r| r.estimated_energy_kw).sum();
    let total_water_lph: f64 = rooms.iter().map(|r| r.estimated_water_lph).sum();
    let total_occupancy: u64 = rooms.iter().map(|r| u64::from(r.occupancy)).sum();
    let total_capacity: u64 = rooms.iter().map(|r| u64::from(r.capacity)).sum();
    let avg_energy_per_room = if rooms.is_empty() {
        0.0
    } else {
        total_energy_kw / rooms.len() as f64
    };

    BuildingInsight {
        building_id: building_id.to_string(),
        building_name: building_name
            .filter(|name| !name.is_empty())
            .map(String::from),
        total_energy_kw,
        total_water_lph,
        total_occupancy,
        total_capacity,
        occupancy_rate: occupancy_rate(total_occupancy, total_capacity),
        avg_energy_per_room,
        savings_potential: weighted_savings(&rooms),
        recommendations: top_recommendations(&rooms, top_n),
        rooms_succeeded: rooms.len(),
        rooms,
        rooms_attempted,
        failures,
    }
}
