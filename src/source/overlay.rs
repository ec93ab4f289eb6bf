//! Environmental overlay.
//!
//! Rewrites equipment, occupancy and thermal comfort of every room from a
//! handful of campus-wide settings (lights on, AC setpoint, outdoor
//! temperature, ...). Applied by the caller before analysis.

use crate::models::{CampusSnapshot, RoomObservation, RoomType, TemperatureComfort, TimeOfDay};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Campus-wide environmental settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentOverlay {
    /// Occupancy forced on every room not counted by a camera.
    pub avg_occupancy: Option<u32>,
    pub lights_on: bool,
    pub ac_on: bool,
    /// AC setpoint in °C.
    pub ac_temperature: i32,
    pub fans_on: bool,
    /// Share of rooms with a projector running.
    pub projectors_on_percent: u32,
    /// Computers running per lab, classroom or library (at most half the
    /// room's capacity).
    pub computers_count: u32,
    /// Outdoor temperature in °C.
    pub outdoor_temperature: i32,
    /// Stamped on every room when set.
    pub time_of_day: Option<TimeOfDay>,
}

impl Default for EnvironmentOverlay {
    fn default() -> Self {
        Self {
            avg_occupancy: None,
            lights_on: true,
            ac_on: true,
            ac_temperature: 22,
            fans_on: false,
            projectors_on_percent: 30,
            computers_count: 5,
            outdoor_temperature: 30,
            time_of_day: None,
        }
    }
}

/// Equipment whose state the overlay decides.
fn is_governed(name: &str) -> bool {
    name == "lights"
        || name == "ac"
        || name.starts_with("ac_")
        || name == "fan"
        || name == "fans"
        || name == "projector"
        || name.starts_with("computer_")
}

impl EnvironmentOverlay {
    /// Return a copy of `snapshot` with the overlay applied.
    ///
    /// Projectors run in the first `projectors_on_percent`% of rooms by room
    /// id, so the result is deterministic. Equipment the overlay does not
    /// govern (lab equipment, kitchens, life safety) is left as observed.
    pub fn apply(&self, snapshot: &CampusSnapshot) -> CampusSnapshot {
        let mut modified = snapshot.clone();

        let mut order: Vec<usize> = (0..modified.rooms.len()).collect();
        order.sort_by(|&a, &b| modified.rooms[a].room_id.cmp(&modified.rooms[b].room_id));
        let total = order.len();

        for (rank, index) in order.into_iter().enumerate() {
            let projector = (rank as u64) * 100 < u64::from(self.projectors_on_percent) * total as u64;
            self.apply_room(&mut modified.rooms[index], projector);
        }

        debug!("Applied environmental overlay to {} rooms", total);
        modified
    }

    fn apply_room(&self, room: &mut RoomObservation, projector: bool) {
        if let Some(avg) = self.avg_occupancy {
            if room.occupancy_detected {
                debug!("Keeping camera-detected occupancy of room {}", room.room_id);
            } else {
                room.occupancy = avg.min(room.capacity);
            }
        }

        room.equipment_running.retain(|e| !is_governed(e));
        if self.lights_on {
            room.equipment_running.insert("lights".to_string());
        }
        if self.ac_on {
            room.equipment_running
                .insert(format!("ac_{}C", self.ac_temperature));
        }
        if self.fans_on {
            room.equipment_running.insert("fans".to_string());
        }
        if projector {
            room.equipment_running.insert("projector".to_string());
        }
        if matches!(
            room.room_type,
            RoomType::Lab | RoomType::Classroom | RoomType::Library
        ) {
            for i in 0..self.computers_count.min(room.capacity / 2) {
                room.equipment_running.insert(format!("computer_{}", i + 1));
            }
        }

        room.temperature_comfort = self.comfort();
        if let Some(time_of_day) = self.time_of_day {
            room.time_of_day = Some(time_of_day);
        }
    }

    fn comfort(&self) -> TemperatureComfort {
        let t = self.outdoor_temperature;
        if self.ac_on {
            if t < 15 {
                TemperatureComfort::TooCold
            } else {
                TemperatureComfort::Comfortable
            }
        } else if t > 30 {
            TemperatureComfort::TooHot
        } else if t < 18 {
            TemperatureComfort::TooCold
        } else {
            TemperatureComfort::Comfortable
        }
    }
}
