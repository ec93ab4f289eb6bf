//! What-if simulation scenarios.
//!
//! A scenario arrives as `{"name", "type", "building_id", "parameters"}`.
//! The parameter map is parsed into a typed variant per scenario kind so it
//! can be validated before anything is analyzed. Unknown kinds are kept as
//! [`ScenarioKind::Other`] and later applied as a no-op.

use crate::models::{RoomType, TimeOfDay, DEFAULT_LIFE_SAFETY_EQUIPMENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Kind of operational change a scenario simulates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScenarioKind {
    CloseBuilding,
    ReduceHvac,
    ShiftSchedule,
    Other(String),
}

impl From<String> for ScenarioKind {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "close_building" => ScenarioKind::CloseBuilding,
            "reduce_hvac" => ScenarioKind::ReduceHvac,
            "shift_schedule" => ScenarioKind::ShiftSchedule,
            _ => ScenarioKind::Other(s),
        }
    }
}

impl From<ScenarioKind> for String {
    fn from(kind: ScenarioKind) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioKind::CloseBuilding => write!(f, "close_building"),
            ScenarioKind::ReduceHvac => write!(f, "reduce_hvac"),
            ScenarioKind::ShiftSchedule => write!(f, "shift_schedule"),
            ScenarioKind::Other(s) => write!(f, "{}", s),
        }
    }
}

fn default_life_safety() -> Vec<String> {
    DEFAULT_LIFE_SAFETY_EQUIPMENT
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Parameters for `close_building`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloseBuildingParams {
    /// Equipment left running in a closed building.
    pub life_safety_equipment: Vec<String>,
}

impl Default for CloseBuildingParams {
    fn default() -> Self {
        Self {
            life_safety_equipment: default_life_safety(),
        }
    }
}

/// Parameters for `reduce_hvac`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReduceHvacParams {
    /// Rooms below this occupancy ratio lose their HVAC equipment.
    pub occupancy_threshold: f64,
    /// Equipment name prefixes treated as HVAC (`ac` matches `ac`, `ac_22C`).
    pub hvac_equipment: Vec<String>,
}

impl Default for ReduceHvacParams {
    fn default() -> Self {
        Self {
            occupancy_threshold: 0.3,
            hvac_equipment: vec!["ac".to_string(), "fan".to_string()],
        }
    }
}

/// Parameters for `shift_schedule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftScheduleParams {
    /// Buildings that receive the moved occupants. When empty, the
    /// scenario's `building_id` is used, and failing that the
    /// `target_count` buildings with the most eligible capacity.
    pub target_buildings: Vec<String>,
    pub target_count: usize,
    /// Room types whose occupants are moved.
    pub room_types: Vec<RoomType>,
    /// Only move rooms observed at this time of day (all rooms when unset).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeOfDay>,
    /// Strip non-life-safety equipment from rooms this scenario empties.
    pub power_down_vacated: bool,
    pub life_safety_equipment: Vec<String>,
}

impl Default for ShiftScheduleParams {
    fn default() -> Self {
        Self {
            target_buildings: Vec::new(),
            target_count: 2,
            room_types: vec![RoomType::Classroom, RoomType::Lab],
            time_of_day: None,
            power_down_vacated: true,
            life_safety_equipment: default_life_safety(),
        }
    }
}

/// Typed scenario parameters, one variant per kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScenarioParameters {
    CloseBuilding(CloseBuildingParams),
    ReduceHvac(ReduceHvacParams),
    ShiftSchedule(ShiftScheduleParams),
    Unrecognized(Value),
}

impl ScenarioParameters {
    /// Parse a raw parameter map for the given kind, applying defaults.
    pub fn parse(kind: &ScenarioKind, raw: Value) -> Result<Self, String> {
        let raw = match raw {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        let params = match kind {
            ScenarioKind::CloseBuilding => ScenarioParameters::CloseBuilding(
                serde_json::from_value(raw).map_err(|e| e.to_string())?,
            ),
            ScenarioKind::ReduceHvac => {
                let params: ReduceHvacParams =
                    serde_json::from_value(raw).map_err(|e| e.to_string())?;
                if !(0.0..=1.0).contains(&params.occupancy_threshold) {
                    return Err(format!(
                        "occupancy_threshold must be between 0.0 and 1.0, got {}",
                        params.occupancy_threshold
                    ));
                }
                ScenarioParameters::ReduceHvac(params)
            }
            ScenarioKind::ShiftSchedule => {
                let params: ShiftScheduleParams =
                    serde_json::from_value(raw).map_err(|e| e.to_string())?;
                if params.target_count == 0 {
                    return Err("target_count must be at least 1".to_string());
                }
                ScenarioParameters::ShiftSchedule(params)
            }
            ScenarioKind::Other(_) => ScenarioParameters::Unrecognized(raw),
        };

        Ok(params)
    }

    /// Whether these parameters belong to scenarios of `kind`.
    pub fn fits(&self, kind: &ScenarioKind) -> bool {
        matches!(
            (self, kind),
            (ScenarioParameters::CloseBuilding(_), ScenarioKind::CloseBuilding)
                | (ScenarioParameters::ReduceHvac(_), ScenarioKind::ReduceHvac)
                | (ScenarioParameters::ShiftSchedule(_), ScenarioKind::ShiftSchedule)
                | (ScenarioParameters::Unrecognized(_), ScenarioKind::Other(_))
        )
    }

    pub fn defaults_for(kind: &ScenarioKind) -> Self {
        match kind {
            ScenarioKind::CloseBuilding => ScenarioParameters::CloseBuilding(Default::default()),
            ScenarioKind::ReduceHvac => ScenarioParameters::ReduceHvac(Default::default()),
            ScenarioKind::ShiftSchedule => ScenarioParameters::ShiftSchedule(Default::default()),
            ScenarioKind::Other(_) => ScenarioParameters::Unrecognized(Value::Null),
        }
    }
}

/// Wire form of a scenario, before its parameters are typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawScenario {
    name: String,
    #[serde(rename = "type")]
    kind: ScenarioKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    building_id: Option<String>,
    #[serde(default)]
    parameters: Value,
}

/// An immutable what-if scenario.
///
/// The parameters always match the kind: both are only set through
/// constructors that keep them in step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawScenario", into = "RawScenario")]
pub struct SimulationScenario {
    name: String,
    kind: ScenarioKind,
    building_id: Option<String>,
    parameters: ScenarioParameters,
}

impl TryFrom<RawScenario> for SimulationScenario {
    type Error = String;

    fn try_from(raw: RawScenario) -> Result<Self, Self::Error> {
        let parameters = ScenarioParameters::parse(&raw.kind, raw.parameters)
            .map_err(|e| format!("scenario '{}': {}", raw.name, e))?;
        Ok(Self {
            name: raw.name,
            kind: raw.kind,
            building_id: raw.building_id,
            parameters,
        })
    }
}

impl From<SimulationScenario> for RawScenario {
    fn from(scenario: SimulationScenario) -> Self {
        Self {
            name: scenario.name,
            kind: scenario.kind,
            building_id: scenario.building_id,
            parameters: serde_json::to_value(&scenario.parameters).unwrap_or_default(),
        }
    }
}

impl SimulationScenario {
    /// A scenario of the given kind with default parameters.
    pub fn new(name: &str, kind: ScenarioKind, building_id: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            parameters: ScenarioParameters::defaults_for(&kind),
            kind,
            building_id: building_id.map(String::from),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ScenarioKind {
        &self.kind
    }

    pub fn building_id(&self) -> Option<&str> {
        self.building_id.as_deref()
    }

    pub fn parameters(&self) -> &ScenarioParameters {
        &self.parameters
    }

    /// Replace the parameters. Fails when they belong to another kind.
    pub fn with_parameters(mut self, parameters: ScenarioParameters) -> Result<Self, String> {
        if !parameters.fits(&self.kind) {
            return Err(format!(
                "scenario '{}': parameters do not fit kind {}",
                self.name, self.kind
            ));
        }
        self.parameters = parameters;
        Ok(self)
    }

    pub fn close_building(name: &str, building_id: &str) -> Self {
        Self::new(name, ScenarioKind::CloseBuilding, Some(building_id))
    }

    pub fn reduce_hvac(name: &str, occupancy_threshold: f64) -> Self {
        let mut scenario = Self::new(name, ScenarioKind::ReduceHvac, None);
        scenario.parameters = ScenarioParameters::ReduceHvac(ReduceHvacParams {
            occupancy_threshold,
            ..Default::default()
        });
        scenario
    }

    pub fn shift_schedule(name: &str, target_buildings: &[&str]) -> Self {
        let mut scenario = Self::new(name, ScenarioKind::ShiftSchedule, None);
        scenario.parameters = ScenarioParameters::ShiftSchedule(ShiftScheduleParams {
            target_buildings: target_buildings.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        });
        scenario
    }
}

/// A canned scenario offered to users as a starting point.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: ScenarioKind,
    pub description: &'static str,
    pub estimated_impact: &'static str,
}

pub fn templates() -> Vec<ScenarioTemplate> {
    vec![
        ScenarioTemplate {
            id: "close_building_night",
            name: "Close Building After 8 PM",
            kind: ScenarioKind::CloseBuilding,
            description: "Simulate closing a building after 8 PM to save energy",
            estimated_impact: "15-25% building energy savings",
        },
        ScenarioTemplate {
            id: "reduce_hvac_low_occupancy",
            name: "Reduce HVAC in Low Occupancy",
            kind: ScenarioKind::ReduceHvac,
            description: "Reduce HVAC in rooms with <30% occupancy",
            estimated_impact: "10-15% campus energy savings",
        },
        ScenarioTemplate {
            id: "consolidate_classes",
            name: "Consolidate Evening Classes",
            kind: ScenarioKind::ShiftSchedule,
            description: "Move all evening classes to 2 buildings",
            estimated_impact: "20-30% evening energy savings",
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_close_building_with_defaults() {
        let json = r#"{"name": "Close library", "type": "close_building", "building_id": "lib"}"#;
        let scenario: SimulationScenario = serde_json::from_str(json).unwrap();
        assert_eq!(*scenario.kind(), ScenarioKind::CloseBuilding);
        assert_eq!(scenario.building_id(), Some("lib"));
        match scenario.parameters() {
            ScenarioParameters::CloseBuilding(p) => {
                assert!(p.life_safety_equipment.contains(&"fire_alarm".to_string()));
            }
            other => panic!("unexpected parameters: {:?}", other),
        }
    }

    #[test]
    fn test_parse_reduce_hvac_parameters() {
        let json = r#"{"name": "HVAC", "type": "reduce_hvac", "parameters": {"occupancy_threshold": 0.5}}"#;
        let scenario: SimulationScenario = serde_json::from_str(json).unwrap();
        match scenario.parameters() {
            ScenarioParameters::ReduceHvac(p) => {
                assert_eq!(p.occupancy_threshold, 0.5);
                assert_eq!(p.hvac_equipment, vec!["ac", "fan"]);
            }
            other => panic!("unexpected parameters: {:?}", other),
        }
    }

    #[test]
    fn test_reduce_hvac_rejects_out_of_range_threshold() {
        let json = r#"{"name": "HVAC", "type": "reduce_hvac", "parameters": {"occupancy_threshold": 1.5}}"#;
        let err = serde_json::from_str::<SimulationScenario>(json).unwrap_err();
        assert!(err.to_string().contains("occupancy_threshold"));
    }

    #[test]
    fn test_shift_schedule_parameters_shape_is_checked() {
        let json = r#"{"name": "Shift", "type": "shift_schedule", "parameters": {"target_buildings": "sci"}}"#;
        assert!(serde_json::from_str::<SimulationScenario>(json).is_err());

        let json = r#"{"name": "Shift", "type": "shift_schedule", "parameters": {"target_buildings": ["sci"], "room_types": ["classroom"]}}"#;
        let scenario: SimulationScenario = serde_json::from_str(json).unwrap();
        match scenario.parameters() {
            ScenarioParameters::ShiftSchedule(p) => {
                assert_eq!(p.target_buildings, vec!["sci"]);
                assert_eq!(p.room_types, vec![RoomType::Classroom]);
                assert_eq!(p.target_count, 2);
            }
            other => panic!("unexpected parameters: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_is_kept() {
        let json = r#"{"name": "Solar", "type": "install_solar", "parameters": {"panels": 40}}"#;
        let scenario: SimulationScenario = serde_json::from_str(json).unwrap();
        assert_eq!(*scenario.kind(), ScenarioKind::Other("install_solar".to_string()));
        assert!(matches!(scenario.parameters(), ScenarioParameters::Unrecognized(_)));
    }

    #[test]
    fn test_parameters_follow_kind() {
        let json = r#"[
            {"name": "a", "type": "close_building", "building_id": "lib"},
            {"name": "b", "type": "reduce_hvac"},
            {"name": "c", "type": "shift_schedule"},
            {"name": "d", "type": "install_solar"}
        ]"#;
        let mut scenarios: Vec<SimulationScenario> = serde_json::from_str(json).unwrap();
        scenarios.push(SimulationScenario::reduce_hvac("e", 0.2));
        scenarios.push(SimulationScenario::shift_schedule("f", &["sci"]));
        for scenario in &scenarios {
            assert!(scenario.parameters().fits(scenario.kind()), "{}", scenario.name());
        }

        let mismatched = SimulationScenario::close_building("close lib", "lib")
            .with_parameters(ScenarioParameters::ReduceHvac(ReduceHvacParams::default()));
        assert!(mismatched.unwrap_err().contains("close_building"));

        let widened = SimulationScenario::reduce_hvac("hvac", 0.3)
            .with_parameters(ScenarioParameters::ReduceHvac(ReduceHvacParams {
                occupancy_threshold: 0.6,
                ..ReduceHvacParams::default()
            }))
            .unwrap();
        assert_eq!(*widened.kind(), ScenarioKind::ReduceHvac);
    }

    #[test]
    fn test_scenario_serializes_to_wire_form() {
        let scenario = SimulationScenario::close_building("Close eng", "eng");
        let json = serde_json::to_value(&scenario).unwrap();
        assert_eq!(json["type"], "close_building");
        assert_eq!(json["building_id"], "eng");
        assert!(json["parameters"]["life_safety_equipment"].is_array());
    }

    #[test]
    fn test_templates_cover_known_kinds() {
        let kinds: Vec<_> = templates().into_iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&ScenarioKind::CloseBuilding));
        assert!(kinds.contains(&ScenarioKind::ReduceHvac));
        assert!(kinds.contains(&ScenarioKind::ShiftSchedule));
    }
}
