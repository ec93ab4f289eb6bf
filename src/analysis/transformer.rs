//! Scenario application.
//!
//! [`apply`] maps a scenario and a snapshot to a new, modified snapshot. It
//! never analyzes anything and never touches its input.

use crate::error::{OrchestratorError, Result};
use crate::models::{is_life_safety_equipment, CampusSnapshot, RoomObservation};
use crate::scenario::{
    CloseBuildingParams, ReduceHvacParams, ScenarioParameters, ShiftScheduleParams,
    SimulationScenario,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Check that a scenario can be applied to the snapshot.
///
/// Runs before any analysis so a bad scenario costs nothing.
pub fn validate(scenario: &SimulationScenario, snapshot: &CampusSnapshot) -> Result<()> {
    match scenario.parameters() {
        ScenarioParameters::CloseBuilding(_) => {
            let building_id = scenario.building_id().ok_or_else(|| {
                OrchestratorError::InvalidScenario {
                    name: scenario.name().to_string(),
                    reason: "close_building requires a building_id".to_string(),
                }
            })?;
            require_building(snapshot, building_id)
        }
        ScenarioParameters::ReduceHvac(_) => match scenario.building_id() {
            Some(building_id) => require_building(snapshot, building_id),
            None => Ok(()),
        },
        ScenarioParameters::ShiftSchedule(params) => {
            for target in &params.target_buildings {
                require_building(snapshot, target)?;
            }
            if params.target_buildings.is_empty() {
                if let Some(building_id) = scenario.building_id() {
                    require_building(snapshot, building_id)?;
                }
            }
            Ok(())
        }
        ScenarioParameters::Unrecognized(_) => Ok(()),
    }
}

fn require_building(snapshot: &CampusSnapshot, building_id: &str) -> Result<()> {
    let known = snapshot.buildings.contains_key(building_id)
        || snapshot.rooms.iter().any(|r| r.building_id == building_id);
    if known {
        Ok(())
    } else {
        Err(OrchestratorError::Structural(format!(
            "scenario references unknown building '{}'",
            building_id
        )))
    }
}

/// Apply a scenario, returning the modified snapshot.
///
/// Unrecognized scenario kinds are applied as a no-op.
pub fn apply(scenario: &SimulationScenario, snapshot: &CampusSnapshot) -> Result<CampusSnapshot> {
    validate(scenario, snapshot)?;

    let mut modified = snapshot.clone();
    match scenario.parameters() {
        ScenarioParameters::CloseBuilding(params) => {
            if let Some(building_id) = scenario.building_id() {
                close_building(&mut modified, building_id, params);
            }
        }
        ScenarioParameters::ReduceHvac(params) => {
            reduce_hvac(&mut modified, scenario.building_id(), params);
        }
        ScenarioParameters::ShiftSchedule(params) => {
            shift_schedule(&mut modified, scenario.building_id(), params);
        }
        ScenarioParameters::Unrecognized(_) => {
            warn!(
                "Scenario '{}' has unrecognized type '{}'; leaving observations unchanged",
                scenario.name(),
                scenario.kind()
            );
        }
    }

    Ok(modified)
}

fn keep_life_safety(room: &mut RoomObservation, life_safety: &[String]) {
    room.equipment_running
        .retain(|e| is_life_safety_equipment(e, life_safety));
}

fn close_building(snapshot: &mut CampusSnapshot, building_id: &str, params: &CloseBuildingParams) {
    let mut closed = 0;
    for room in snapshot
        .rooms
        .iter_mut()
        .filter(|r| r.building_id == building_id)
    {
        room.occupancy = 0;
        room.water_running = false;
        keep_life_safety(room, &params.life_safety_equipment);
        closed += 1;
    }
    info!("Closed building {} ({} rooms)", building_id, closed);
}

/// True if `equipment` is the HVAC unit named by `prefix`
/// (`ac` matches `ac`, `ac_22C`; `fan` matches `fan`, `fans`, `fan_2`).
fn matches_hvac(equipment: &str, prefix: &str) -> bool {
    let equipment = equipment.trim().to_lowercase();
    let prefix = prefix.trim().to_lowercase();
    if prefix.is_empty() {
        return false;
    }
    let plural = format!("{}s", prefix);
    equipment == prefix
        || equipment == plural
        || equipment.starts_with(&format!("{}_", prefix))
        || equipment.starts_with(&format!("{}_", plural))
}

fn reduce_hvac(snapshot: &mut CampusSnapshot, building_id: Option<&str>, params: &ReduceHvacParams) {
    let mut reduced = 0;
    for room in snapshot
        .rooms
        .iter_mut()
        .filter(|r| building_id.map_or(true, |b| r.building_id == b))
    {
        if room.occupancy_ratio() >= params.occupancy_threshold {
            continue;
        }
        let before = room.equipment_running.len();
        room.equipment_running.retain(|e| {
            !params
                .hvac_equipment
                .iter()
                .any(|prefix| matches_hvac(e, prefix))
        });
        if room.equipment_running.len() < before {
            reduced += 1;
        }
    }
    info!(
        "Reduced HVAC in {} rooms below {:.0}% occupancy",
        reduced,
        params.occupancy_threshold * 100.0
    );
}

/// Buildings receiving moved occupants.
///
/// Explicit targets win, then the scenario's building, then the
/// `target_count` buildings with the most eligible capacity (ties by id).
fn resolve_targets(
    snapshot: &CampusSnapshot,
    building_id: Option<&str>,
    params: &ShiftScheduleParams,
) -> BTreeSet<String> {
    if !params.target_buildings.is_empty() {
        return params.target_buildings.iter().cloned().collect();
    }
    if let Some(building_id) = building_id {
        return BTreeSet::from([building_id.to_string()]);
    }

    let mut capacity: BTreeMap<&str, u64> = BTreeMap::new();
    for room in snapshot
        .rooms
        .iter()
        .filter(|r| params.room_types.contains(&r.room_type))
    {
        *capacity.entry(room.building_id.as_str()).or_default() += u64::from(room.capacity);
    }
    let mut ranked: Vec<(&str, u64)> = capacity.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(params.target_count)
        .map(|(id, _)| id.to_string())
        .collect()
}

fn shift_schedule(
    snapshot: &mut CampusSnapshot,
    building_id: Option<&str>,
    params: &ShiftScheduleParams,
) {
    let targets = resolve_targets(snapshot, building_id, params);
    let eligible = |room: &RoomObservation| params.room_types.contains(&room.room_type);

    let mut order: Vec<usize> = (0..snapshot.rooms.len()).collect();
    order.sort_by(|&a, &b| snapshot.rooms[a].room_id.cmp(&snapshot.rooms[b].room_id));

    let (receivers, sources): (Vec<usize>, Vec<usize>) = order
        .into_iter()
        .filter(|&i| eligible(&snapshot.rooms[i]))
        .partition(|&i| targets.contains(&snapshot.rooms[i].building_id));
    let sources: Vec<usize> = sources
        .into_iter()
        .filter(|&i| {
            params
                .time_of_day
                .map_or(true, |t| snapshot.rooms[i].time_of_day == Some(t))
        })
        .collect();

    let mut moved: u64 = 0;
    let mut vacated = 0;
    let mut receiver_iter = receivers.iter().copied().peekable();
    for source in sources {
        let occupied = snapshot.rooms[source].clamped_occupancy();
        if occupied == 0 {
            continue;
        }
        let mut pending = occupied;
        while pending > 0 {
            let Some(&receiver) = receiver_iter.peek() else {
                break;
            };
            let room = &mut snapshot.rooms[receiver];
            let free = room.capacity.saturating_sub(room.occupancy);
            if free == 0 {
                receiver_iter.next();
                continue;
            }
            let take = free.min(pending);
            if room.occupancy == 0 {
                room.equipment_running.insert("lights".to_string());
            }
            room.occupancy += take;
            pending -= take;
            moved += u64::from(take);
        }

        let room = &mut snapshot.rooms[source];
        room.occupancy = pending;
        if pending == 0 {
            vacated += 1;
            if params.power_down_vacated {
                keep_life_safety(room, &params.life_safety_equipment);
            }
        }
    }

    debug!("Shift targets: {:?}", targets);
    info!(
        "Shifted {} occupants into {} buildings, {} rooms vacated",
        moved,
        targets.len(),
        vacated
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoomType, TimeOfDay};
    use crate::scenario::{ScenarioKind, ScenarioParameters, SimulationScenario};

    fn snapshot() -> CampusSnapshot {
        CampusSnapshot::from_rooms(vec![
            RoomObservation::new("lib-1", "lib", RoomType::Library, 50)
                .with_occupancy(20)
                .with_equipment(["lights", "ac_22C", "fire_alarm"])
                .with_water_running(true),
            RoomObservation::new("lib-2", "lib", RoomType::Classroom, 30)
                .with_occupancy(5)
                .with_equipment(["lights", "projector", "emergency_lighting"]),
            RoomObservation::new("sci-1", "sci", RoomType::Lab, 20)
                .with_occupancy(2)
                .with_equipment(["ac", "fans", "lab_equipment"]),
            RoomObservation::new("sci-2", "sci", RoomType::Classroom, 40)
                .with_occupancy(30)
                .with_equipment(["ac_24C", "lights"]),
            RoomObservation::new("eng-1", "eng", RoomType::Classroom, 60)
                .with_occupancy(10),
        ])
    }

    #[test]
    fn test_close_building_keeps_life_safety_only() {
        let before = snapshot();
        let scenario = SimulationScenario::close_building("close lib", "lib");
        let after = apply(&scenario, &before).unwrap();

        for room in after.rooms.iter().filter(|r| r.building_id == "lib") {
            assert_eq!(room.occupancy, 0);
            assert!(!room.water_running);
        }
        let lib1 = after.room("lib-1").unwrap();
        assert_eq!(
            lib1.equipment_running.iter().collect::<Vec<_>>(),
            vec!["fire_alarm"]
        );
        assert_eq!(after.room("sci-2"), before.room("sci-2"));
        // input untouched
        assert_eq!(before.room("lib-1").unwrap().occupancy, 20);
    }

    #[test]
    fn test_close_building_requires_known_building() {
        let scenario = SimulationScenario::close_building("close gym", "gym");
        assert!(matches!(
            apply(&scenario, &snapshot()),
            Err(OrchestratorError::Structural(_))
        ));

        let scenario = SimulationScenario::new("no target", ScenarioKind::CloseBuilding, None);
        assert!(matches!(
            apply(&scenario, &snapshot()),
            Err(OrchestratorError::InvalidScenario { .. })
        ));
    }

    #[test]
    fn test_reduce_hvac_below_threshold() {
        let after = apply(&SimulationScenario::reduce_hvac("hvac", 0.3), &snapshot()).unwrap();
        // 2/20 occupied: ac and fans removed
        let sci1 = after.room("sci-1").unwrap();
        assert_eq!(
            sci1.equipment_running.iter().collect::<Vec<_>>(),
            vec!["lab_equipment"]
        );
        // 30/40 occupied: untouched
        assert!(after.room("sci-2").unwrap().equipment_running.contains("ac_24C"));
        // 20/50 is 0.4: untouched
        assert!(after.room("lib-1").unwrap().equipment_running.contains("ac_22C"));
    }

    #[test]
    fn test_hvac_matching() {
        assert!(matches_hvac("ac_22C", "ac"));
        assert!(matches_hvac("AC", "ac"));
        assert!(matches_hvac("fans", "fan"));
        assert!(!matches_hvac("accelerator", "ac"));
        assert!(!matches_hvac("lights", ""));
    }

    #[test]
    fn test_shift_schedule_moves_into_targets() {
        let before = snapshot();
        let scenario = SimulationScenario::shift_schedule("consolidate", &["eng"]);
        let after = apply(&scenario, &before).unwrap();

        let eng = after.room("eng-1").unwrap();
        // 10 already there, room for 50 more: lib-2 (5), sci-1 (2), sci-2 (30)
        assert_eq!(eng.occupancy, 47);
        assert_eq!(after.room("lib-2").unwrap().occupancy, 0);
        assert_eq!(after.room("sci-2").unwrap().occupancy, 0);
        // library rooms are not eligible
        assert_eq!(after.room("lib-1").unwrap().occupancy, 20);
        // vacated rooms powered down to life safety
        assert_eq!(
            after
                .room("lib-2")
                .unwrap()
                .equipment_running
                .iter()
                .collect::<Vec<_>>(),
            vec!["emergency_lighting"]
        );

        let total = |s: &CampusSnapshot| s.rooms.iter().map(|r| r.occupancy).sum::<u32>();
        assert_eq!(total(&before), total(&after));
    }

    #[test]
    fn test_shift_schedule_respects_capacity() {
        let before = CampusSnapshot::from_rooms(vec![
            RoomObservation::new("a-1", "a", RoomType::Classroom, 10).with_occupancy(8),
            RoomObservation::new("b-1", "b", RoomType::Classroom, 30).with_occupancy(25),
        ]);
        let after = apply(
            &SimulationScenario::shift_schedule("into a", &["a"]),
            &before,
        )
        .unwrap();
        assert_eq!(after.room("a-1").unwrap().occupancy, 10);
        assert_eq!(after.room("b-1").unwrap().occupancy, 23);
        assert!(after.room("b-1").unwrap().occupancy <= 30);
    }

    #[test]
    fn test_shift_schedule_leaves_empty_rooms_alone() {
        let before = CampusSnapshot::from_rooms(vec![
            RoomObservation::new("a-1", "a", RoomType::Classroom, 40).with_occupancy(5),
            RoomObservation::new("b-1", "b", RoomType::Classroom, 30)
                .with_equipment(["lights", "projector"]),
            RoomObservation::new("b-2", "b", RoomType::Classroom, 30)
                .with_occupancy(10)
                .with_equipment(["lights"]),
        ]);
        let after = apply(
            &SimulationScenario::shift_schedule("into a", &["a"]),
            &before,
        )
        .unwrap();

        // nobody moved out of b-1
        assert_eq!(after.room("b-1"), before.room("b-1"));
        assert_eq!(after.room("b-2").unwrap().occupancy, 0);
        assert!(after.room("b-2").unwrap().equipment_running.is_empty());
        assert_eq!(after.room("a-1").unwrap().occupancy, 15);
    }

    #[test]
    fn test_shift_schedule_without_room_keeps_equipment() {
        let before = CampusSnapshot::from_rooms(vec![
            RoomObservation::new("a-1", "a", RoomType::Classroom, 10)
                .with_occupancy(10)
                .with_equipment(["lights"]),
            RoomObservation::new("b-1", "b", RoomType::Classroom, 30)
                .with_occupancy(12)
                .with_equipment(["lights", "projector"]),
        ]);
        let after = apply(
            &SimulationScenario::shift_schedule("into a", &["a"]),
            &before,
        )
        .unwrap();

        assert_eq!(after, before);
    }

    #[test]
    fn test_shift_schedule_filters_by_time_of_day() {
        let before = CampusSnapshot::from_rooms(vec![
            RoomObservation::new("a-1", "a", RoomType::Classroom, 100).with_occupancy(10),
            RoomObservation::new("b-1", "b", RoomType::Classroom, 30)
                .with_occupancy(8)
                .with_equipment(["lights"])
                .with_time_of_day(TimeOfDay::Evening),
            RoomObservation::new("b-2", "b", RoomType::Classroom, 30)
                .with_occupancy(20)
                .with_equipment(["lights"])
                .with_time_of_day(TimeOfDay::Morning),
            RoomObservation::new("b-3", "b", RoomType::Classroom, 30)
                .with_occupancy(4)
                .with_equipment(["lights"]),
        ]);
        let scenario = SimulationScenario::new("evening classes", ScenarioKind::ShiftSchedule, None)
            .with_parameters(ScenarioParameters::ShiftSchedule(ShiftScheduleParams {
                target_buildings: vec!["a".to_string()],
                time_of_day: Some(TimeOfDay::Evening),
                ..ShiftScheduleParams::default()
            }))
            .unwrap();
        let after = apply(&scenario, &before).unwrap();

        assert_eq!(after.room("a-1").unwrap().occupancy, 18);
        assert_eq!(after.room("b-1").unwrap().occupancy, 0);
        assert!(after.room("b-1").unwrap().equipment_running.is_empty());
        assert_eq!(after.room("b-2"), before.room("b-2"));
        assert_eq!(after.room("b-3"), before.room("b-3"));
    }

    #[test]
    fn test_shift_schedule_picks_largest_buildings_by_default() {
        let snapshot = snapshot();
        let params = ShiftScheduleParams {
            target_count: 1,
            ..ShiftScheduleParams::default()
        };
        let targets = resolve_targets(&snapshot, None, &params);
        // eng 60, sci 60, lib 30 eligible seats: tie broken by id
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec!["eng"]);
    }

    #[test]
    fn test_unknown_kind_is_noop() {
        let json = r#"{"name": "Solar", "type": "install_solar"}"#;
        let scenario: SimulationScenario = serde_json::from_str(json).unwrap();
        let before = snapshot();
        assert_eq!(apply(&scenario, &before).unwrap(), before);
    }
}
