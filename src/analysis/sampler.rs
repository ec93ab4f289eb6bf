//! Budget-bounded selection of what to analyze.

use crate::error::{OrchestratorError, Result};
use crate::models::{CampusSnapshot, EffectiveBudget, RoomObservation};
use std::collections::BTreeMap;
use tracing::debug;

/// Buildings and rooms chosen for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection<'a> {
    /// Selected rooms per building, keyed and ordered by building id; each
    /// list is ordered by room id.
    pub buildings: BTreeMap<&'a str, Vec<&'a RoomObservation>>,
    pub budget: EffectiveBudget,
    /// Something was left out because of the budget.
    pub limited: bool,
}

impl Selection<'_> {
    pub fn room_count(&self) -> usize {
        self.buildings.values().map(Vec::len).sum()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }
}

/// Select the bounded subset of the campus to analyze.
///
/// Buildings are taken in id order up to `max_buildings`. The room cap is
/// then shared out round-robin over the selected buildings, and each
/// building contributes a prefix of its id-ordered rooms. The result only
/// depends on the snapshot and the budget, so a baseline and a modified
/// snapshot with the same topology sample the same rooms.
pub fn select<'a>(snapshot: &'a CampusSnapshot, budget: EffectiveBudget) -> Result<Selection<'a>> {
    if budget.max_rooms == Some(0) {
        return Err(OrchestratorError::InvalidBudget(
            "max_rooms must be at least 1".to_string(),
        ));
    }
    if budget.max_buildings == Some(0) {
        return Err(OrchestratorError::InvalidBudget(
            "max_buildings must be at least 1".to_string(),
        ));
    }

    let grouped = snapshot.rooms_by_building();
    let total_rooms: usize = grouped.values().map(Vec::len).sum();
    let total_buildings = grouped.len();

    let mut buildings: Vec<(&'a str, Vec<&'a RoomObservation>)> = grouped.into_iter().collect();
    if let Some(max_buildings) = budget.max_buildings {
        buildings.truncate(max_buildings);
    }

    if let Some(max_rooms) = budget.max_rooms {
        let quotas = round_robin_quotas(
            &buildings.iter().map(|(_, rooms)| rooms.len()).collect::<Vec<_>>(),
            max_rooms,
        );
        for ((_, rooms), quota) in buildings.iter_mut().zip(quotas) {
            rooms.truncate(quota);
        }
        buildings.retain(|(_, rooms)| !rooms.is_empty());
    }

    let selection = Selection {
        buildings: buildings.into_iter().collect(),
        budget,
        limited: false,
    };
    let limited =
        selection.room_count() < total_rooms || selection.building_count() < total_buildings;

    debug!(
        "Selected {}/{} rooms in {}/{} buildings ({})",
        selection.room_count(),
        total_rooms,
        selection.building_count(),
        total_buildings,
        budget
    );

    Ok(Selection { limited, ..selection })
}

/// Share `cap` slots over buckets of the given sizes one at a time, in
/// order, skipping buckets that are full.
fn round_robin_quotas(sizes: &[usize], cap: usize) -> Vec<usize> {
    let mut quotas = vec![0; sizes.len()];
    let mut remaining = cap.min(sizes.iter().sum());
    while remaining > 0 {
        for (quota, size) in quotas.iter_mut().zip(sizes) {
            if remaining == 0 {
                break;
            }
            if *quota < *size {
                *quota += 1;
                remaining -= 1;
            }
        }
    }
    quotas
}
