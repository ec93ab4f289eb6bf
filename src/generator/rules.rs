//! Deterministic rule-based insight generator.
//!
//! Estimates are a pure function of the observation: a per-room-type base
//! load scaled by occupancy plus a fixed draw per running piece of
//! equipment.

use super::InsightGenerator;
use crate::error::GeneratorError;
use crate::models::{
    is_life_safety_equipment, RoomMetrics, RoomObservation, RoomType, TemperatureComfort,
    DEFAULT_LIFE_SAFETY_EQUIPMENT,
};
use async_trait::async_trait;

/// Share of the base load drawn by an empty room.
const IDLE_FLOOR: f64 = 0.3;

/// Rule engine used when no generative backend is configured.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedGenerator;

impl RuleBasedGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate metrics synchronously.
    pub fn estimate(&self, room: &RoomObservation) -> RoomMetrics {
        let ratio = room.occupancy_ratio();
        let occupancy_pct = ratio * 100.0;
        let occupied = room.clamped_occupancy() > 0;

        let base = base_load_kw(room.room_type) * (IDLE_FLOOR + (1.0 - IDLE_FLOOR) * ratio);
        let equipment: f64 = room
            .equipment_running
            .iter()
            .map(|name| equipment_load_kw(name))
            .sum();
        let energy = round2(base + equipment);

        let water = if room.water_running {
            round2(water_base_lph(room.room_type) * (0.2 + 0.8 * ratio))
        } else {
            0.0
        };

        let co2 = (400.0 + occupancy_pct * 4.0).round();

        let has_ac = room.equipment_running.iter().any(|e| is_ac(e));
        let mut recommendations = Vec::new();
        if occupancy_pct < 20.0 && energy > 2.0 {
            if !occupied && has_non_safety_equipment(room) {
                recommendations.push("Power down idle equipment in the empty room".to_string());
            }
            recommendations.push("Reduce HVAC - low occupancy detected".to_string());
            recommendations.push("Auto-dim lights to 40% brightness".to_string());
        }
        if occupancy_pct > 80.0 {
            recommendations.push("Increase ventilation for high occupancy".to_string());
        }
        if has_ac && room.temperature_comfort != TemperatureComfort::Comfortable {
            recommendations.push("Adjust AC setpoint to restore thermal comfort".to_string());
        }
        if room.water_running && !occupied {
            recommendations.push("Shut off running water".to_string());
        }
        recommendations.push("Schedule next maintenance check".to_string());

        let mut anomalies = Vec::new();
        if !occupied && has_non_safety_equipment(room) {
            anomalies.push("Equipment running with no occupants".to_string());
        }
        if !occupied && room.water_running {
            anomalies.push("Water running with no occupants".to_string());
        }

        let vacancy = 1.0 - ratio;
        let savings = (10.0 + 25.0 * vacancy + 5.0 * anomalies.len() as f64).clamp(0.0, 60.0);

        RoomMetrics {
            estimated_energy_kw: energy,
            estimated_water_lph: water,
            estimated_co2_ppm: co2,
            recommendations,
            anomalies,
            savings_potential: round1(savings),
        }
    }
}

#[async_trait]
impl InsightGenerator for RuleBasedGenerator {
    fn name(&self) -> &str {
        "rules"
    }

    async fn generate(&self, room: &RoomObservation) -> Result<RoomMetrics, GeneratorError> {
        Ok(self.estimate(room))
    }
}

/// Full-occupancy load of a room type, in kW.
fn base_load_kw(room_type: RoomType) -> f64 {
    match room_type {
        RoomType::Classroom => 3.5,
        RoomType::Lab => 8.0,
        RoomType::Library => 2.5,
        RoomType::Dorm => 1.2,
        RoomType::Cafeteria => 12.0,
        RoomType::Bathroom => 0.8,
        RoomType::Other => 3.0,
    }
}

fn water_base_lph(room_type: RoomType) -> f64 {
    match room_type {
        RoomType::Bathroom => 3.0,
        RoomType::Cafeteria => 5.0,
        _ => 1.0,
    }
}

fn is_ac(name: &str) -> bool {
    name == "ac" || name.starts_with("ac_")
}

fn has_non_safety_equipment(room: &RoomObservation) -> bool {
    room.equipment_running
        .iter()
        .any(|e| !is_life_safety_equipment(e, &DEFAULT_LIFE_SAFETY_EQUIPMENT))
}

fn equipment_load_kw(name: &str) -> f64 {
    let name = name.trim().to_lowercase();
    if is_life_safety_equipment(&name, &DEFAULT_LIFE_SAFETY_EQUIPMENT) {
        return 0.05;
    }
    if is_ac(&name) {
        return 2.0;
    }
    match name.as_str() {
        "fan" | "fans" => 0.2,
        "lights" => 0.5,
        "projector" => 0.3,
        "computers" => 1.0,
        "lab_equipment" => 2.5,
        "kitchen" => 4.0,
        n if n.starts_with("computer_") => 0.15,
        _ => 0.2,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_room_draws_idle_floor() {
        let room = RoomObservation::new("c-1", "b", RoomType::Classroom, 30);
        let metrics = RuleBasedGenerator::new().estimate(&room);
        assert_eq!(metrics.estimated_energy_kw, 1.05);
        assert_eq!(metrics.estimated_water_lph, 0.0);
        assert_eq!(metrics.estimated_co2_ppm, 400.0);
        assert!(metrics.anomalies.is_empty());
        assert_eq!(
            metrics.recommendations.last().map(String::as_str),
            Some("Schedule next maintenance check")
        );
    }

    #[test]
    fn test_full_room_scales_base_load() {
        let room = RoomObservation::new("l-1", "b", RoomType::Lab, 20)
            .with_occupancy(20)
            .with_equipment(["ac_22C", "lights"]);
        let metrics = RuleBasedGenerator::new().estimate(&room);
        assert_eq!(metrics.estimated_energy_kw, 10.5);
        assert_eq!(metrics.estimated_co2_ppm, 800.0);
        assert!(metrics
            .recommendations
            .contains(&"Increase ventilation for high occupancy".to_string()));
    }

    #[test]
    fn test_unoccupied_equipment_is_an_anomaly() {
        let room = RoomObservation::new("l-2", "b", RoomType::Lab, 20)
            .with_equipment(["lab_equipment", "lights"])
            .with_water_running(true);
        let metrics = RuleBasedGenerator::new().estimate(&room);
        assert_eq!(metrics.anomalies.len(), 2);
        assert_eq!(metrics.savings_potential, 45.0);
        assert_eq!(
            metrics.recommendations[0],
            "Power down idle equipment in the empty room"
        );
        assert!(metrics.estimated_water_lph > 0.0);
    }

    #[test]
    fn test_life_safety_only_is_not_an_anomaly() {
        let room = RoomObservation::new("d-1", "b", RoomType::Dorm, 4)
            .with_equipment(["fire_alarm", "emergency_lighting"]);
        let metrics = RuleBasedGenerator::new().estimate(&room);
        assert!(metrics.anomalies.is_empty());
        assert_eq!(metrics.estimated_energy_kw, 0.46);
    }

    #[test]
    fn test_estimates_are_deterministic() {
        let room = RoomObservation::new("c-9", "b", RoomType::Cafeteria, 120)
            .with_occupancy(37)
            .with_equipment(["kitchen", "ac", "lights"]);
        let generator = RuleBasedGenerator::new();
        assert_eq!(generator.estimate(&room), generator.estimate(&room));
    }

    #[test]
    fn test_generate_matches_estimate() {
        let room = RoomObservation::new("b-1", "b", RoomType::Bathroom, 6).with_occupancy(3);
        let generator = RuleBasedGenerator::new();
        let metrics = tokio_test::block_on(generator.generate(&room)).unwrap();
        assert!(metrics.estimated_energy_kw > 0.0);
        assert_eq!(metrics, generator.estimate(&room));
    }
}
