//! Data models for campus analysis.
//!
//! This module contains the value objects passed through the analysis
//! pipeline: room observations going in, room/building/campus insights
//! coming out, and the budget and scenario types that steer a run.

use crate::error::FailureKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Occupancy ratio below which a room counts as lightly used.
pub const LOW_OCCUPANCY_RATIO: f64 = 0.3;

/// Occupancy ratio at or above which a room counts as heavily used.
pub const HIGH_OCCUPANCY_RATIO: f64 = 0.7;

/// Equipment that stays powered when a space is closed.
pub const DEFAULT_LIFE_SAFETY_EQUIPMENT: [&str; 3] =
    ["emergency_lighting", "fire_alarm", "security_system"];

/// Returns true if `name` appears in `life_safety` (case-insensitive).
pub fn is_life_safety_equipment<S: AsRef<str>>(name: &str, life_safety: &[S]) -> bool {
    life_safety
        .iter()
        .any(|item| item.as_ref().eq_ignore_ascii_case(name.trim()))
}

/// Kind of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RoomType {
    #[default]
    Classroom,
    Lab,
    Library,
    Dorm,
    Cafeteria,
    Bathroom,
    Other,
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomType::Classroom => write!(f, "classroom"),
            RoomType::Lab => write!(f, "lab"),
            RoomType::Library => write!(f, "library"),
            RoomType::Dorm => write!(f, "dorm"),
            RoomType::Cafeteria => write!(f, "cafeteria"),
            RoomType::Bathroom => write!(f, "bathroom"),
            RoomType::Other => write!(f, "other"),
        }
    }
}

impl From<&str> for RoomType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "classroom" => RoomType::Classroom,
            "lab" | "laboratory" => RoomType::Lab,
            "library" => RoomType::Library,
            "dorm" | "dormitory" => RoomType::Dorm,
            "cafeteria" => RoomType::Cafeteria,
            "bathroom" | "restroom" => RoomType::Bathroom,
            _ => RoomType::Other,
        }
    }
}

impl From<String> for RoomType {
    fn from(s: String) -> Self {
        RoomType::from(s.as_str())
    }
}

/// Perceived thermal comfort in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureComfort {
    TooCold,
    #[default]
    Comfortable,
    TooHot,
}

/// Part of the day an observation was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeOfDay::Morning => write!(f, "morning"),
            TimeOfDay::Afternoon => write!(f, "afternoon"),
            TimeOfDay::Evening => write!(f, "evening"),
            TimeOfDay::Night => write!(f, "night"),
        }
    }
}

/// Tri-state occupancy classification shared by every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyLevel {
    Low,
    Medium,
    High,
}

impl OccupancyLevel {
    /// Classify an occupancy count against a capacity.
    ///
    /// Uses integer arithmetic so the 0.3 and 0.7 boundaries are exact:
    /// a ratio of exactly 0.3 is `Medium`, exactly 0.7 is `High`.
    /// A zero capacity classifies as `Low`.
    pub fn classify(occupancy: u32, capacity: u32) -> Self {
        if capacity == 0 {
            return OccupancyLevel::Low;
        }
        let occupancy = u64::from(occupancy.min(capacity)) * 10;
        let capacity = u64::from(capacity);
        if occupancy < capacity * 3 {
            OccupancyLevel::Low
        } else if occupancy < capacity * 7 {
            OccupancyLevel::Medium
        } else {
            OccupancyLevel::High
        }
    }

    /// Classify an already-computed occupancy ratio.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < LOW_OCCUPANCY_RATIO {
            OccupancyLevel::Low
        } else if ratio < HIGH_OCCUPANCY_RATIO {
            OccupancyLevel::Medium
        } else {
            OccupancyLevel::High
        }
    }
}

impl fmt::Display for OccupancyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OccupancyLevel::Low => write!(f, "Low"),
            OccupancyLevel::Medium => write!(f, "Medium"),
            OccupancyLevel::High => write!(f, "High"),
        }
    }
}

/// Snapshot of one room: its static configuration plus the current
/// observation. Read-only to the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomObservation {
    pub room_id: String,
    pub building_id: String,
    #[serde(rename = "type", default)]
    pub room_type: RoomType,
    pub capacity: u32,
    #[serde(default)]
    pub occupancy: u32,
    /// Equipment currently powered, by name (`lights`, `ac_22C`, `projector`, ...).
    #[serde(default)]
    pub equipment_running: BTreeSet<String>,
    #[serde(default)]
    pub temperature_comfort: TemperatureComfort,
    #[serde(default)]
    pub water_running: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<u32>,
    /// Occupancy came from a camera count rather than an estimate.
    #[serde(default)]
    pub occupancy_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeOfDay>,
}

impl RoomObservation {
    pub fn new(room_id: &str, building_id: &str, room_type: RoomType, capacity: u32) -> Self {
        Self {
            room_id: room_id.to_string(),
            building_id: building_id.to_string(),
            room_type,
            capacity,
            occupancy: 0,
            equipment_running: BTreeSet::new(),
            temperature_comfort: TemperatureComfort::Comfortable,
            water_running: false,
            floor: None,
            occupancy_detected: false,
            time_of_day: None,
        }
    }

    pub fn with_occupancy(mut self, occupancy: u32) -> Self {
        self.occupancy = occupancy;
        self
    }

    pub fn with_equipment<'a, I: IntoIterator<Item = &'a str>>(mut self, equipment: I) -> Self {
        self.equipment_running
            .extend(equipment.into_iter().map(String::from));
        self
    }

    pub fn with_water_running(mut self, running: bool) -> Self {
        self.water_running = running;
        self
    }

    pub fn with_time_of_day(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = Some(time_of_day);
        self
    }

    /// Occupancy clamped into `[0, capacity]`.
    pub fn clamped_occupancy(&self) -> u32 {
        self.occupancy.min(self.capacity)
    }

    /// Clamped occupancy divided by capacity, 0 for a zero capacity.
    pub fn occupancy_ratio(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            f64::from(self.clamped_occupancy()) / f64::from(self.capacity)
        }
    }

    pub fn occupancy_level(&self) -> OccupancyLevel {
        OccupancyLevel::classify(self.occupancy, self.capacity)
    }
}

/// General campus information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampusInfo {
    #[serde(default = "default_campus_name")]
    pub name: String,
}

impl Default for CampusInfo {
    fn default() -> Self {
        Self {
            name: default_campus_name(),
        }
    }
}

fn default_campus_name() -> String {
    "Campus".to_string()
}

/// Static information about a building.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floors: Option<u32>,
}

/// Campus topology plus the current room observations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampusSnapshot {
    #[serde(default)]
    pub campus: CampusInfo,
    #[serde(default)]
    pub buildings: BTreeMap<String, BuildingInfo>,
    #[serde(default)]
    pub rooms: Vec<RoomObservation>,
}

impl CampusSnapshot {
    /// Build a snapshot whose building registry is derived from the rooms.
    pub fn from_rooms(rooms: Vec<RoomObservation>) -> Self {
        let buildings = rooms
            .iter()
            .map(|r| {
                (
                    r.building_id.clone(),
                    BuildingInfo {
                        name: r.building_id.clone(),
                        floors: None,
                    },
                )
            })
            .collect();
        Self {
            campus: CampusInfo::default(),
            buildings,
            rooms,
        }
    }

    /// Rooms grouped by building id, each group sorted by room id.
    pub fn rooms_by_building(&self) -> BTreeMap<&str, Vec<&RoomObservation>> {
        let mut grouped: BTreeMap<&str, Vec<&RoomObservation>> = BTreeMap::new();
        for room in &self.rooms {
            grouped.entry(room.building_id.as_str()).or_default().push(room);
        }
        for rooms in grouped.values_mut() {
            rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        }
        grouped
    }

    pub fn room(&self, room_id: &str) -> Option<&RoomObservation> {
        self.rooms.iter().find(|r| r.room_id == room_id)
    }
}

/// Raw per-room estimates returned by an insight generator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomMetrics {
    pub estimated_energy_kw: f64,
    #[serde(default)]
    pub estimated_water_lph: f64,
    #[serde(default)]
    pub estimated_co2_ppm: f64,
    /// Ordered most-impactful first.
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub anomalies: Vec<String>,
    /// Percentage of the room's load that could be saved.
    #[serde(default)]
    pub savings_potential: f64,
}

/// Normalized result of analyzing one room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInsight {
    pub room_id: String,
    pub building_id: String,
    pub room_type: RoomType,
    pub occupancy: u32,
    pub capacity: u32,
    pub occupancy_level: OccupancyLevel,
    pub estimated_energy_kw: f64,
    pub estimated_water_lph: f64,
    pub estimated_co2_ppm: f64,
    pub recommendations: Vec<String>,
    pub anomalies: Vec<String>,
    pub savings_potential: f64,
}

/// A room whose analysis failed, kept for attempted-vs-succeeded reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomFailure {
    pub room_id: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Aggregated insight for one building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingInsight {
    pub building_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building_name: Option<String>,
    pub total_energy_kw: f64,
    pub total_water_lph: f64,
    pub total_occupancy: u64,
    pub total_capacity: u64,
    /// `total_occupancy / total_capacity`, 0 when capacity is 0.
    pub occupancy_rate: f64,
    pub avg_energy_per_room: f64,
    pub savings_potential: f64,
    /// Successfully analyzed rooms, sorted by room id.
    pub rooms: Vec<RoomInsight>,
    pub recommendations: Vec<String>,
    pub rooms_attempted: usize,
    pub rooms_succeeded: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<RoomFailure>,
}

impl BuildingInsight {
    pub fn rooms_failed(&self) -> usize {
        self.rooms_attempted - self.rooms_succeeded
    }

    pub fn room(&self, room_id: &str) -> Option<&RoomInsight> {
        self.rooms.iter().find(|r| r.room_id == room_id)
    }
}

/// Campus-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampusMetrics {
    pub total_energy_kw: f64,
    pub total_water_lph: f64,
    pub total_occupancy: u64,
    pub total_capacity: u64,
    pub occupancy_rate: f64,
    pub estimated_cost_per_hour: f64,
    /// Energy-weighted mean of room savings potential.
    pub savings_potential: f64,
}

/// A building whose load exceeds the critical threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalBuilding {
    pub building_id: String,
    pub energy_kw: f64,
    pub reason: String,
}

/// Branch of the campus recommendation table that produced an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    PeakDemand,
    SmartGrid,
    HvacOptimization,
    ConsolidateSpace,
    LoadBalancing,
    PriorityBuilding,
}

impl RecommendationKind {
    pub fn emoji(&self) -> &'static str {
        match self {
            RecommendationKind::PeakDemand => "🏢",
            RecommendationKind::SmartGrid => "💡",
            RecommendationKind::HvacOptimization => "🌡️",
            RecommendationKind::ConsolidateSpace | RecommendationKind::LoadBalancing => "📊",
            RecommendationKind::PriorityBuilding => "🎯",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampusRecommendation {
    pub kind: RecommendationKind,
    pub message: String,
}

/// Named analysis budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetLevel {
    Low,
    Medium,
    High,
}

impl BudgetLevel {
    /// Default `(max_rooms, max_buildings)` for the level.
    pub fn default_caps(&self) -> (Option<usize>, Option<usize>) {
        match self {
            BudgetLevel::Low => (Some(10), Some(2)),
            BudgetLevel::Medium => (Some(30), Some(4)),
            BudgetLevel::High => (None, None),
        }
    }
}

impl fmt::Display for BudgetLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetLevel::Low => write!(f, "low"),
            BudgetLevel::Medium => write!(f, "medium"),
            BudgetLevel::High => write!(f, "high"),
        }
    }
}

/// Caps on how much of the campus one call analyzes.
///
/// Explicit `max_rooms` / `max_buildings` always win over the caps implied
/// by `level`. With neither set, everything is analyzed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPolicy {
    #[serde(default)]
    pub level: Option<BudgetLevel>,
    #[serde(default)]
    pub max_rooms: Option<usize>,
    #[serde(default)]
    pub max_buildings: Option<usize>,
}

impl BudgetPolicy {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn from_level(level: BudgetLevel) -> Self {
        Self {
            level: Some(level),
            ..Self::default()
        }
    }

    pub fn with_max_rooms(mut self, max_rooms: usize) -> Self {
        self.max_rooms = Some(max_rooms);
        self
    }

    pub fn with_max_buildings(mut self, max_buildings: usize) -> Self {
        self.max_buildings = Some(max_buildings);
        self
    }

    /// Resolve the level defaults and explicit overrides into concrete caps.
    pub fn effective(&self) -> EffectiveBudget {
        let (level_rooms, level_buildings) = self
            .level
            .map(|level| level.default_caps())
            .unwrap_or((None, None));
        EffectiveBudget {
            level: self.level,
            max_rooms: self.max_rooms.or(level_rooms),
            max_buildings: self.max_buildings.or(level_buildings),
        }
    }
}

/// Budget caps actually applied to a call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveBudget {
    pub level: Option<BudgetLevel>,
    pub max_rooms: Option<usize>,
    pub max_buildings: Option<usize>,
}

impl EffectiveBudget {
    pub fn is_unbounded(&self) -> bool {
        self.max_rooms.is_none() && self.max_buildings.is_none()
    }

    /// Same caps, hence the same sampled rooms. The level label is ignored.
    pub fn same_caps(&self, other: &EffectiveBudget) -> bool {
        self.max_rooms == other.max_rooms && self.max_buildings == other.max_buildings
    }
}

impl fmt::Display for EffectiveBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cap = |c: Option<usize>| c.map_or_else(|| "unbounded".to_string(), |n| n.to_string());
        write!(
            f,
            "rooms: {}, buildings: {}",
            cap(self.max_rooms),
            cap(self.max_buildings)
        )?;
        if let Some(level) = self.level {
            write!(f, " (level {})", level)?;
        }
        Ok(())
    }
}

/// How a call went, so callers can tell budget cuts from failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub generator: String,
    pub buildings_total: usize,
    pub rooms_total: usize,
    pub buildings_analyzed: usize,
    pub rooms_attempted: usize,
    pub rooms_succeeded: usize,
    pub budget: EffectiveBudget,
    /// The budget excluded part of the campus.
    pub budget_limited: bool,
    /// At least one room was cancelled by the call deadline.
    pub deadline_expired: bool,
    pub duration_ms: u64,
}

impl ExecutionMetadata {
    pub fn rooms_failed(&self) -> usize {
        self.rooms_attempted - self.rooms_succeeded
    }
}

/// Result of one campus-wide analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampusInsight {
    pub timestamp: DateTime<Utc>,
    pub campus_name: String,
    pub buildings: BTreeMap<String, BuildingInsight>,
    pub metrics: CampusMetrics,
    /// Sorted by energy, highest first.
    pub critical_buildings: Vec<CriticalBuilding>,
    pub recommendations: Vec<CampusRecommendation>,
    pub execution: ExecutionMetadata,
}

impl CampusInsight {
    pub fn building(&self, building_id: &str) -> Option<&BuildingInsight> {
        self.buildings.get(building_id)
    }

    pub fn room(&self, room_id: &str) -> Option<&RoomInsight> {
        self.buildings.values().find_map(|b| b.room(room_id))
    }

    pub fn is_critical(&self, building_id: &str) -> bool {
        self.critical_buildings
            .iter()
            .any(|c| c.building_id == building_id)
    }
}

/// Per-building change between a baseline and a modified run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDelta {
    pub building_id: String,
    pub baseline_energy_kw: f64,
    pub modified_energy_kw: f64,
    pub energy_savings_pct: f64,
    pub baseline_occupancy_rate: f64,
    pub modified_occupancy_rate: f64,
    pub occupancy_delta: i64,
}

/// Campus-wide change between a baseline and a modified run.
///
/// Positive savings always mean the modified scenario uses less.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComparisonDeltas {
    pub energy_savings_pct: f64,
    pub energy_savings_kw: f64,
    pub water_savings_lph: f64,
    pub cost_savings_per_hour: f64,
    /// Modified minus baseline occupancy.
    pub occupancy_delta: i64,
    pub occupancy_rate_delta: f64,
    pub buildings: Vec<BuildingDelta>,
}

/// Outcome of simulating one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub scenario: String,
    pub scenario_kind: crate::scenario::ScenarioKind,
    pub baseline: CampusInsight,
    pub modified: CampusInsight,
    pub deltas: ComparisonDeltas,
}

/// Several scenarios ranked by energy savings, highest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioRanking {
    pub scenarios_compared: usize,
    pub results: Vec<ComparisonResult>,
    pub recommended: Option<String>,
}
