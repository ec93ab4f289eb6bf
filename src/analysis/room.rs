//! Single-room analysis.

use crate::error::{AnalysisError, GeneratorError};
use crate::generator::InsightGenerator;
use crate::models::{RoomInsight, RoomMetrics, RoomObservation};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Validates a room, calls the insight generator and normalizes its answer.
///
/// Every generator call first takes a permit from the shared limiter, so the
/// number of simultaneous calls stays bounded no matter how many buildings
/// and rooms are being fanned out.
#[derive(Clone)]
pub struct RoomAnalyzer {
    generator: Arc<dyn InsightGenerator>,
    limiter: Arc<Semaphore>,
    timeout: Duration,
}

impl RoomAnalyzer {
    pub fn new(generator: Arc<dyn InsightGenerator>, limiter: Arc<Semaphore>, timeout: Duration) -> Self {
        Self {
            generator,
            limiter,
            timeout,
        }
    }

    /// Analyze one room.
    ///
    /// Never panics on generator failure: every error comes back as an
    /// [`AnalysisError`] tagged with the room id. When `deadline` passes
    /// before the room finishes, the in-flight call is dropped and the room
    /// is reported as cancelled.
    pub async fn analyze(
        &self,
        observation: &RoomObservation,
        deadline: Option<Instant>,
    ) -> Result<RoomInsight, AnalysisError> {
        let room_id = observation.room_id.as_str();

        // Rooms dispatched after the deadline never reach the generator
        if deadline.is_some_and(|d| Instant::now() >= d) {
            debug!("Room {} dispatched after analysis deadline", room_id);
            return Err(AnalysisError::Cancelled {
                room_id: room_id.to_string(),
            });
        }

        if observation.capacity == 0 {
            return Err(AnalysisError::InvalidConfig {
                room_id: room_id.to_string(),
                reason: "capacity must be positive".to_string(),
            });
        }

        let mut room = observation.clone();
        if room.occupancy > room.capacity {
            debug!(
                "Clamping occupancy of room {} from {} to {}",
                room_id, room.occupancy, room.capacity
            );
            room.occupancy = room.capacity;
        }

        let call = self.call_generator(&room);
        let metrics = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, call).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("Room {} cancelled at analysis deadline", room_id);
                    return Err(AnalysisError::Cancelled {
                        room_id: room_id.to_string(),
                    });
                }
            },
            None => call.await,
        }
        .map_err(|e| {
            warn!("Room {} analysis failed: {}", room_id, e);
            AnalysisError::from_generator(room_id, e)
        })?;

        normalize(&room, metrics).map_err(|e| {
            warn!("Room {} returned unusable metrics: {}", room_id, e);
            AnalysisError::from_generator(room_id, e)
        })
    }

    async fn call_generator(&self, room: &RoomObservation) -> Result<RoomMetrics, GeneratorError> {
        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| GeneratorError::Unavailable("generator limiter closed".to_string()))?;

        match tokio::time::timeout(self.timeout, self.generator.generate(room)).await {
            Ok(result) => result,
            Err(_) => Err(GeneratorError::Timeout(self.timeout)),
        }
    }
}

/// Shape generator output into a [`RoomInsight`].
fn normalize(room: &RoomObservation, metrics: RoomMetrics) -> Result<RoomInsight, GeneratorError> {
    if !metrics.estimated_energy_kw.is_finite() {
        return Err(GeneratorError::MalformedResponse(format!(
            "estimated_energy_kw is not a finite number: {}",
            metrics.estimated_energy_kw
        )));
    }

    let non_negative = |v: f64| if v.is_finite() { v.max(0.0) } else { 0.0 };

    Ok(RoomInsight {
        room_id: room.room_id.clone(),
        building_id: room.building_id.clone(),
        room_type: room.room_type,
        occupancy: room.occupancy,
        capacity: room.capacity,
        occupancy_level: room.occupancy_level(),
        estimated_energy_kw: metrics.estimated_energy_kw.max(0.0),
        estimated_water_lph: non_negative(metrics.estimated_water_lph),
        estimated_co2_ppm: non_negative(metrics.estimated_co2_ppm),
        recommendations: clean_list(metrics.recommendations),
        anomalies: clean_list(metrics.anomalies),
        savings_potential: non_negative(metrics.savings_potential).min(100.0),
    })
}

/// Trim entries, drop empties and exact repeats, keep order.
fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}
