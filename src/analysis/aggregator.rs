//! Insight aggregation and statistics.
//!
//! Pure functions that fold room insights into building figures and
//! building insights into campus figures. Every list produced here is
//! sorted by a fixed key so the output does not depend on the order in
//! which concurrent analyses completed.

use crate::models::{
    BuildingDelta, BuildingInsight, CampusInsight, CampusMetrics, CampusRecommendation,
    ComparisonDeltas, CriticalBuilding, OccupancyLevel, RecommendationKind, RoomInsight,
};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

/// `occupancy / capacity`, 0 when capacity is 0.
pub fn occupancy_rate(occupancy: u64, capacity: u64) -> f64 {
    if capacity == 0 {
        0.0
    } else {
        occupancy as f64 / capacity as f64
    }
}

/// Energy-weighted mean of savings potential, 0 when no energy is drawn.
pub fn weighted_savings<'a, I>(rooms: I) -> f64
where
    I: IntoIterator<Item = &'a RoomInsight>,
{
    let (weighted, energy) = rooms.into_iter().fold((0.0, 0.0), |(w, e), room| {
        (
            w + room.estimated_energy_kw * room.savings_potential,
            e + room.estimated_energy_kw,
        )
    });
    if energy > 0.0 {
        weighted / energy
    } else {
        0.0
    }
}

/// Normalize recommendation text for deduplication.
///
/// Lowercases, collapses whitespace and drops trailing punctuation, so
/// "Turn off lights." and "turn  off lights" are the same recommendation.
pub fn normalize_recommendation(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_lowercase()
}

/// Order rooms by savings potential (highest first), then by room id.
fn by_impact(a: &RoomInsight, b: &RoomInsight) -> Ordering {
    b.savings_potential
        .total_cmp(&a.savings_potential)
        .then_with(|| a.room_id.cmp(&b.room_id))
}

/// Collect the `n` highest-impact recommendations across rooms.
///
/// Rooms are visited in savings order (ties by room id ascending) and each
/// room's list in its own order; the first occurrence of a normalized
/// text wins.
pub fn top_recommendations(rooms: &[RoomInsight], n: usize) -> Vec<String> {
    let mut ranked: Vec<&RoomInsight> = rooms.iter().collect();
    ranked.sort_by(|a, b| by_impact(a, b));

    let mut seen = HashSet::new();
    let mut top = Vec::new();
    for room in ranked {
        for recommendation in &room.recommendations {
            if top.len() == n {
                return top;
            }
            let key = normalize_recommendation(recommendation);
            if key.is_empty() || !seen.insert(key) {
                continue;
            }
            top.push(recommendation.trim().to_string());
        }
    }
    top
}

/// Order buildings by energy (highest first), then by building id.
fn by_energy(a: &BuildingInsight, b: &BuildingInsight) -> Ordering {
    b.total_energy_kw
        .total_cmp(&a.total_energy_kw)
        .then_with(|| a.building_id.cmp(&b.building_id))
}

/// The building drawing the most energy, ties broken by id.
pub fn top_building<'a, I>(buildings: I) -> Option<&'a BuildingInsight>
where
    I: IntoIterator<Item = &'a BuildingInsight>,
{
    buildings.into_iter().min_by(|a, b| by_energy(a, b))
}

/// Buildings whose total energy exceeds `threshold_kw`, highest first.
pub fn critical_buildings<'a, I>(buildings: I, threshold_kw: f64) -> Vec<CriticalBuilding>
where
    I: IntoIterator<Item = &'a BuildingInsight>,
{
    let mut critical: Vec<&BuildingInsight> = buildings
        .into_iter()
        .filter(|b| b.total_energy_kw > threshold_kw)
        .collect();
    critical.sort_by(|a, b| by_energy(a, b));

    critical
        .into_iter()
        .map(|b| CriticalBuilding {
            building_id: b.building_id.clone(),
            energy_kw: b.total_energy_kw,
            reason: format!(
                "High energy usage: {:.1} kW exceeds {:.1} kW",
                b.total_energy_kw, threshold_kw
            ),
        })
        .collect()
}

/// Campus totals as sums over building totals.
pub fn campus_metrics<'a, I>(
    buildings: I,
    energy_price_per_kwh: f64,
    water_price_per_liter: f64,
) -> CampusMetrics
where
    I: IntoIterator<Item = &'a BuildingInsight> + Clone,
{
    let mut metrics = CampusMetrics::default();
    for building in buildings.clone() {
        metrics.total_energy_kw += building.total_energy_kw;
        metrics.total_water_lph += building.total_water_lph;
        metrics.total_occupancy += building.total_occupancy;
        metrics.total_capacity += building.total_capacity;
    }
    metrics.occupancy_rate = occupancy_rate(metrics.total_occupancy, metrics.total_capacity);
    metrics.estimated_cost_per_hour = metrics.total_energy_kw * energy_price_per_kwh
        + metrics.total_water_lph * water_price_per_liter;
    metrics.savings_potential = weighted_savings(buildings.into_iter().flat_map(|b| &b.rooms));
    metrics
}

/// Occupancy rate below which space consolidation is suggested.
pub const CONSOLIDATION_RATE: f64 = 0.6;

/// Campus-scope recommendations, in a fixed order:
///
/// 1. peak demand at the top-energy building, when more than half the
///    seats are taken
/// 2. smart grid, with the campus savings potential
/// 3. HVAC optimization, with the energy share of low-occupancy rooms
/// 4. consolidate space below 60% occupancy, otherwise load balancing
/// 5. priority action for the top-energy building
pub fn campus_recommendations(
    buildings: &[&BuildingInsight],
    metrics: &CampusMetrics,
) -> Vec<CampusRecommendation> {
    let mut recommendations = Vec::new();
    let top = top_building(buildings.iter().copied());

    if let Some(top) = top {
        if metrics.total_occupancy * 2 > metrics.total_capacity {
            recommendations.push(CampusRecommendation {
                kind: RecommendationKind::PeakDemand,
                message: format!(
                    "Peak energy demand concentrated in {} ({:.1} kW)",
                    top.building_id, top.total_energy_kw
                ),
            });
        }
    }

    recommendations.push(CampusRecommendation {
        kind: RecommendationKind::SmartGrid,
        message: format!(
            "Smart grid implementation: {:.0}% energy reduction potential",
            metrics.savings_potential
        ),
    });

    let low_energy: f64 = buildings
        .iter()
        .flat_map(|b| &b.rooms)
        .filter(|r| r.occupancy_level == OccupancyLevel::Low)
        .map(|r| r.estimated_energy_kw)
        .sum();
    let low_share = if metrics.total_energy_kw > 0.0 {
        low_energy / metrics.total_energy_kw * 100.0
    } else {
        0.0
    };
    recommendations.push(CampusRecommendation {
        kind: RecommendationKind::HvacOptimization,
        message: format!(
            "HVAC optimization: {:.0}% of campus energy is drawn by low-occupancy rooms",
            low_share
        ),
    });

    if metrics.occupancy_rate < CONSOLIDATION_RATE {
        recommendations.push(CampusRecommendation {
            kind: RecommendationKind::ConsolidateSpace,
            message: format!(
                "Consolidate underutilized spaces: {:.0}% of seating capacity is idle",
                (1.0 - metrics.occupancy_rate) * 100.0
            ),
        });
    } else {
        recommendations.push(CampusRecommendation {
            kind: RecommendationKind::LoadBalancing,
            message: "Distribute classes during peak hours to balance load".to_string(),
        });
    }

    if let Some(top) = top {
        recommendations.push(CampusRecommendation {
            kind: RecommendationKind::PriorityBuilding,
            message: format!(
                "Priority: {} shows highest energy use with {:.0}% savings potential",
                top.building_id, top.savings_potential
            ),
        });
    }

    recommendations
}

/// Percentage of baseline energy saved by the modified run.
///
/// Positive means the modified run uses less. Exactly 0 when the baseline
/// draws no energy.
pub fn savings_pct(baseline_kw: f64, modified_kw: f64) -> f64 {
    if baseline_kw == 0.0 {
        0.0
    } else {
        (baseline_kw - modified_kw) / baseline_kw * 100.0
    }
}

/// Campus and per-building deltas between two analyses.
pub fn comparison_deltas(baseline: &CampusInsight, modified: &CampusInsight) -> ComparisonDeltas {
    let b = &baseline.metrics;
    let m = &modified.metrics;

    let ids: BTreeSet<&String> = baseline
        .buildings
        .keys()
        .chain(modified.buildings.keys())
        .collect();

    let buildings = ids
        .into_iter()
        .map(|id| {
            let before = baseline.buildings.get(id);
            let after = modified.buildings.get(id);
            let energy = |insight: Option<&BuildingInsight>| insight.map_or(0.0, |i| i.total_energy_kw);
            let rate = |insight: Option<&BuildingInsight>| insight.map_or(0.0, |i| i.occupancy_rate);
            let occupancy = |insight: Option<&BuildingInsight>| insight.map_or(0, |i| i.total_occupancy);
            BuildingDelta {
                building_id: id.clone(),
                baseline_energy_kw: energy(before),
                modified_energy_kw: energy(after),
                energy_savings_pct: savings_pct(energy(before), energy(after)),
                baseline_occupancy_rate: rate(before),
                modified_occupancy_rate: rate(after),
                occupancy_delta: occupancy(after) as i64 - occupancy(before) as i64,
            }
        })
        .collect();

    ComparisonDeltas {
        energy_savings_pct: savings_pct(b.total_energy_kw, m.total_energy_kw),
        energy_savings_kw: b.total_energy_kw - m.total_energy_kw,
        water_savings_lph: b.total_water_lph - m.total_water_lph,
        cost_savings_per_hour: b.estimated_cost_per_hour - m.estimated_cost_per_hour,
        occupancy_delta: m.total_occupancy as i64 - b.total_occupancy as i64,
        occupancy_rate_delta: m.occupancy_rate - b.occupancy_rate,
        buildings,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::RoomType;

    pub(crate) fn room(id: &str, energy: f64, savings: f64, recs: &[&str]) -> RoomInsight {
        RoomInsight {
            room_id: id.to_string(),
            building_id: "b".to_string(),
            room_type: RoomType::Classroom,
            occupancy: 10,
            capacity: 20,
            occupancy_level: OccupancyLevel::Medium,
            estimated_energy_kw: energy,
            estimated_water_lph: 0.0,
            estimated_co2_ppm: 400.0,
            recommendations: recs.iter().map(|s| s.to_string()).collect(),
            anomalies: Vec::new(),
            savings_potential: savings,
        }
    }

    pub(crate) fn building(id: &str, energy: f64, occupancy: u64, capacity: u64) -> BuildingInsight {
        BuildingInsight {
            building_id: id.to_string(),
            building_name: None,
            total_energy_kw: energy,
            total_water_lph: 0.0,
            total_occupancy: occupancy,
            total_capacity: capacity,
            occupancy_rate: occupancy_rate(occupancy, capacity),
            avg_energy_per_room: energy,
            savings_potential: 20.0,
            rooms: vec![room(&format!("{}-1", id), energy, 20.0, &[])],
            recommendations: Vec::new(),
            rooms_attempted: 1,
            rooms_succeeded: 1,
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_normalize_recommendation() {
        assert_eq!(
            normalize_recommendation("  Turn   off Lights. "),
            normalize_recommendation("turn off lights")
        );
        assert_eq!(normalize_recommendation("!!!"), "");
    }

    #[test]
    fn test_top_recommendations_ranked_and_deduplicated() {
        let rooms = vec![
            room("b-2", 1.0, 30.0, &["Turn off lights", "Close blinds"]),
            room("a-1", 1.0, 30.0, &["turn off lights.", "Reduce HVAC"]),
            room("c-3", 1.0, 50.0, &["Fix leak"]),
        ];
        let top = top_recommendations(&rooms, 3);
        // c-3 first on savings, a-1 before b-2 on id
        assert_eq!(top, vec!["Fix leak", "turn off lights.", "Reduce HVAC"]);
    }

    #[test]
    fn test_top_recommendations_ignores_input_order() {
        let mut rooms = vec![
            room("r1", 1.0, 10.0, &["A"]),
            room("r2", 1.0, 20.0, &["B"]),
            room("r3", 1.0, 20.0, &["C"]),
        ];
        let expected = top_recommendations(&rooms, 2);
        rooms.reverse();
        assert_eq!(top_recommendations(&rooms, 2), expected);
        assert_eq!(expected, vec!["B", "C"]);
    }

    #[test]
    fn test_weighted_savings() {
        let rooms = vec![room("a", 3.0, 10.0, &[]), room("b", 1.0, 50.0, &[])];
        assert_eq!(weighted_savings(&rooms), 20.0);
        assert_eq!(weighted_savings(&[room("z", 0.0, 80.0, &[])]), 0.0);
    }

    #[test]
    fn test_critical_buildings_sorted_desc() {
        let buildings = vec![
            building("a", 60.0, 0, 10),
            building("b", 90.0, 0, 10),
            building("c", 50.0, 0, 10),
            building("d", 60.0, 0, 10),
        ];
        let critical = critical_buildings(&buildings, 50.0);
        let ids: Vec<_> = critical.iter().map(|c| c.building_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "d"]);
    }

    #[test]
    fn test_consolidate_branch_below_sixty_percent() {
        let b1 = building("b1", 3.0, 0, 90);
        let b2 = building("b2", 20.0, 85, 100);
        let buildings = vec![&b1, &b2];
        let metrics = campus_metrics(buildings.iter().copied(), 0.12, 0.002);
        let recs = campus_recommendations(&buildings, &metrics);
        let kinds: Vec<_> = recs.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                RecommendationKind::SmartGrid,
                RecommendationKind::HvacOptimization,
                RecommendationKind::ConsolidateSpace,
                RecommendationKind::PriorityBuilding,
            ]
        );
        assert!(recs[3].message.contains("b2"));
    }

    #[test]
    fn test_load_balancing_and_peak_above_sixty_percent() {
        let b1 = building("b1", 30.0, 70, 100);
        let buildings = vec![&b1];
        let metrics = campus_metrics(buildings.iter().copied(), 0.12, 0.002);
        let recs = campus_recommendations(&buildings, &metrics);
        assert_eq!(recs[0].kind, RecommendationKind::PeakDemand);
        assert_eq!(recs[3].kind, RecommendationKind::LoadBalancing);
        assert_eq!(recs.len(), 5);
    }

    #[test]
    fn test_savings_pct_zero_baseline() {
        assert_eq!(savings_pct(0.0, 0.0), 0.0);
        assert_eq!(savings_pct(0.0, 12.0), 0.0);
        assert_eq!(savings_pct(50.0, 40.0), 20.0);
        assert_eq!(savings_pct(50.0, 60.0), -20.0);
    }
}
