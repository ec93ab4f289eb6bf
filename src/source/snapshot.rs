//! JSON snapshot and scenario files.

use crate::models::CampusSnapshot;
use crate::scenario::SimulationScenario;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Load a campus snapshot from a JSON file.
///
/// When the file has no `buildings` map, one is derived from the rooms.
pub fn load_snapshot(path: &Path) -> Result<CampusSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read campus snapshot: {}", path.display()))?;

    let mut snapshot: CampusSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse campus snapshot: {}", path.display()))?;

    if snapshot.buildings.is_empty() {
        snapshot.buildings = CampusSnapshot::from_rooms(snapshot.rooms.clone()).buildings;
    }

    info!(
        "Loaded {} rooms in {} buildings from {}",
        snapshot.rooms.len(),
        snapshot.buildings.len(),
        path.display()
    );

    Ok(snapshot)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioFile {
    Many(Vec<SimulationScenario>),
    One(SimulationScenario),
}

/// Load one scenario or a list of scenarios from a JSON file.
pub fn load_scenarios(path: &Path) -> Result<Vec<SimulationScenario>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;

    let scenarios = match serde_json::from_str::<ScenarioFile>(&content) {
        Ok(ScenarioFile::Many(list)) => list,
        Ok(ScenarioFile::One(scenario)) => vec![scenario],
        Err(_) => {
            // Re-parse with a concrete type for a useful error message
            let value: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse scenario file: {}", path.display()))?;
            if value.is_array() {
                serde_json::from_value::<Vec<SimulationScenario>>(value)
            } else {
                serde_json::from_value::<SimulationScenario>(value).map(|s| vec![s])
            }
            .with_context(|| format!("Invalid scenario in {}", path.display()))?
        }
    };

    Ok(scenarios)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_snapshot_derives_buildings() {
        let file = write_temp(
            r#"{
                "rooms": [
                    {"room_id": "sci-101", "building_id": "sci", "type": "lab", "capacity": 24, "occupancy": 10},
                    {"room_id": "lib-1", "building_id": "lib", "type": "library", "capacity": 80}
                ]
            }"#,
        );
        let snapshot = load_snapshot(file.path()).unwrap();
        assert_eq!(snapshot.rooms.len(), 2);
        assert!(snapshot.buildings.contains_key("sci"));
        assert!(snapshot.buildings.contains_key("lib"));
        assert_eq!(snapshot.campus.name, "Campus");
    }

    #[test]
    fn test_load_snapshot_keeps_registry() {
        let file = write_temp(
            r#"{
                "campus": {"name": "State University"},
                "buildings": {"sci": {"name": "Science Hall", "floors": 3}},
                "rooms": [{"room_id": "sci-101", "building_id": "sci", "type": "lab", "capacity": 24}]
            }"#,
        );
        let snapshot = load_snapshot(file.path()).unwrap();
        assert_eq!(snapshot.campus.name, "State University");
        assert_eq!(snapshot.buildings["sci"].name, "Science Hall");
        assert_eq!(snapshot.buildings["sci"].floors, Some(3));
    }

    #[test]
    fn test_load_snapshot_reports_bad_json() {
        let file = write_temp("{ not json");
        let err = load_snapshot(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse campus snapshot"));
    }

    #[test]
    fn test_load_scenarios_single_and_list() {
        let one = write_temp(r#"{"name": "Close sci", "type": "close_building", "building_id": "sci"}"#);
        let scenarios = load_scenarios(one.path()).unwrap();
        assert_eq!(scenarios.len(), 1);
        assert_eq!(*scenarios[0].kind(), ScenarioKind::CloseBuilding);

        let many = write_temp(
            r#"[
                {"name": "A", "type": "reduce_hvac"},
                {"name": "B", "type": "shift_schedule", "parameters": {"target_count": 1}}
            ]"#,
        );
        let scenarios = load_scenarios(many.path()).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(*scenarios[1].kind(), ScenarioKind::ShiftSchedule);
    }

    #[test]
    fn test_load_scenarios_reports_invalid_parameters() {
        let file = write_temp(
            r#"{"name": "HVAC", "type": "reduce_hvac", "parameters": {"occupancy_threshold": 2.0}}"#,
        );
        let err = load_scenarios(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("occupancy_threshold"));
    }
}
