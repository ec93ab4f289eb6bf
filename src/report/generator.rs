//! Report generation logic.

use crate::models::{
    BuildingInsight, CampusInsight, ComparisonResult, ExecutionMetadata, ScenarioRanking,
};
use crate::scenario::ScenarioTemplate;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// Generate a markdown report for one campus analysis.
pub fn generate_markdown_report(insight: &CampusInsight) -> String {
    let mut output = String::new();

    output.push_str(&format!("# 🌱 Campus Energy Report: {}\n\n", insight.campus_name));
    output.push_str(&generate_metadata_section(insight));
    output.push_str(&generate_summary_section(insight));
    output.push_str(&generate_critical_section(insight));
    output.push_str(&generate_buildings_section(insight));
    output.push_str(&generate_failures_section(insight));
    output.push_str(&generate_recommendations_section(insight));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(insight: &CampusInsight) -> String {
    let mut section = String::new();
    let execution = &insight.execution;

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Campus:** {}\n", insight.campus_name));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        insight.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Generator:** {}\n", execution.generator));
    section.push_str(&format!("- **Budget:** {}\n", execution.budget));
    section.push_str(&format!(
        "- **Buildings Analyzed:** {}/{}\n",
        execution.buildings_analyzed, execution.buildings_total
    ));
    section.push_str(&format!(
        "- **Rooms Analyzed:** {} succeeded, {} attempted, {} total\n",
        execution.rooms_succeeded, execution.rooms_attempted, execution.rooms_total
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        execution.duration_ms as f64 / 1000.0
    ));
    section.push_str(&coverage_notes(execution));
    section.push('\n');

    section
}

fn coverage_notes(execution: &ExecutionMetadata) -> String {
    let mut notes = String::new();
    if execution.budget_limited {
        notes.push_str("- ⚠️ **Sampled:** the budget left some rooms unanalyzed\n");
    }
    if execution.deadline_expired {
        notes.push_str("- ⏱️ **Deadline expired:** outstanding rooms were cancelled\n");
    }
    notes
}

/// Generate the campus summary section.
fn generate_summary_section(insight: &CampusInsight) -> String {
    let mut section = String::new();
    let metrics = &insight.metrics;

    section.push_str("## Campus Summary\n\n");
    section.push_str("| Metric | Value |\n");
    section.push_str("|:-------|------:|\n");
    section.push_str(&format!(
        "| ⚡ Total Energy | {:.2} kW |\n",
        metrics.total_energy_kw
    ));
    section.push_str(&format!(
        "| 💧 Total Water | {:.1} L/h |\n",
        metrics.total_water_lph
    ));
    section.push_str(&format!(
        "| 👥 Occupancy | {}/{} ({:.1}%) |\n",
        metrics.total_occupancy,
        metrics.total_capacity,
        metrics.occupancy_rate * 100.0
    ));
    section.push_str(&format!(
        "| 💰 Estimated Cost | ${:.2}/h |\n",
        metrics.estimated_cost_per_hour
    ));
    section.push_str(&format!(
        "| 📉 Savings Potential | {:.1}% |\n",
        metrics.savings_potential
    ));
    section.push('\n');

    section
}

/// Generate the critical buildings section.
fn generate_critical_section(insight: &CampusInsight) -> String {
    if insight.critical_buildings.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## 🔴 Critical Buildings\n\n");
    for critical in &insight.critical_buildings {
        section.push_str(&format!(
            "- **{}**: {}\n",
            building_label(insight.building(&critical.building_id), &critical.building_id),
            critical.reason
        ));
    }
    section.push('\n');

    section
}

fn building_label(building: Option<&BuildingInsight>, fallback: &str) -> String {
    match building.and_then(|b| b.building_name.as_deref()) {
        Some(name) => format!("{} ({})", name, fallback),
        None => fallback.to_string(),
    }
}

/// Generate the per-building section.
fn generate_buildings_section(insight: &CampusInsight) -> String {
    let mut section = String::new();

    section.push_str("## Buildings\n\n");
    if insight.buildings.is_empty() {
        section.push_str("No buildings were analyzed.\n\n");
        return section;
    }

    section.push_str("| Building | Energy (kW) | Water (L/h) | Occupancy | Rooms | Savings |\n");
    section.push_str("|:---------|------------:|------------:|:---------:|:-----:|--------:|\n");
    for (id, building) in &insight.buildings {
        let marker = if insight.is_critical(id) { "🔴 " } else { "" };
        section.push_str(&format!(
            "| {}{} | {:.2} | {:.1} | {:.1}% | {}/{} | {:.1}% |\n",
            marker,
            building_label(Some(building), id),
            building.total_energy_kw,
            building.total_water_lph,
            building.occupancy_rate * 100.0,
            building.rooms_succeeded,
            building.rooms_attempted,
            building.savings_potential
        ));
    }
    section.push('\n');

    for (id, building) in &insight.buildings {
        if building.recommendations.is_empty() {
            continue;
        }
        section.push_str(&format!("### {}\n\n", building_label(Some(building), id)));
        for rec in &building.recommendations {
            section.push_str(&format!("- {}\n", rec));
        }
        section.push('\n');
    }

    section
}

/// Generate the room failures section.
fn generate_failures_section(insight: &CampusInsight) -> String {
    let failures: Vec<_> = insight
        .buildings
        .values()
        .flat_map(|b| b.failures.iter())
        .collect();
    if failures.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Room Failures\n\n");
    section.push_str("| Room | Kind | Message |\n");
    section.push_str("|:-----|:----:|:--------|\n");
    for failure in failures {
        section.push_str(&format!(
            "| `{}` | {} | {} |\n",
            failure.room_id,
            failure.kind,
            failure.message.replace('|', "\\|")
        ));
    }
    section.push('\n');

    section
}

/// Generate the recommendations section.
fn generate_recommendations_section(insight: &CampusInsight) -> String {
    if insight.recommendations.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Recommendations\n\n");
    for (i, rec) in insight.recommendations.iter().enumerate() {
        section.push_str(&format!("{}. {} {}\n", i + 1, rec.kind.emoji(), rec.message));
    }
    section.push('\n');

    section
}

/// Generate the footer.
fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by [EcoAgent](https://github.com/ecoagent/ecoagent) v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Generate a markdown report for one scenario simulation.
pub fn generate_comparison_report(result: &ComparisonResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("# 🔬 Scenario Simulation: {}\n\n", result.scenario));
    output.push_str(&format!("- **Scenario Type:** {}\n", result.scenario_kind));
    output.push_str(&format!("- **Campus:** {}\n", result.baseline.campus_name));
    output.push_str(&format!("- **Budget:** {}\n\n", result.baseline.execution.budget));
    output.push_str(&generate_impact_section(result));
    output.push_str(&generate_building_deltas_section(result));

    if !result.modified.recommendations.is_empty() {
        output.push_str("## Recommendations After Change\n\n");
        for (i, rec) in result.modified.recommendations.iter().enumerate() {
            output.push_str(&format!("{}. {} {}\n", i + 1, rec.kind.emoji(), rec.message));
        }
        output.push('\n');
    }

    output.push_str(&generate_footer());
    output
}

fn generate_impact_section(result: &ComparisonResult) -> String {
    let mut section = String::new();
    let deltas = &result.deltas;
    let before = &result.baseline.metrics;
    let after = &result.modified.metrics;

    section.push_str("## Impact\n\n");
    section.push_str("| Metric | Baseline | Scenario | Change |\n");
    section.push_str("|:-------|---------:|---------:|-------:|\n");
    section.push_str(&format!(
        "| ⚡ Energy (kW) | {:.2} | {:.2} | -{:.2} ({:.1}%) |\n",
        before.total_energy_kw, after.total_energy_kw, deltas.energy_savings_kw, deltas.energy_savings_pct
    ));
    section.push_str(&format!(
        "| 💧 Water (L/h) | {:.1} | {:.1} | -{:.1} |\n",
        before.total_water_lph, after.total_water_lph, deltas.water_savings_lph
    ));
    section.push_str(&format!(
        "| 💰 Cost ($/h) | {:.2} | {:.2} | -{:.2} |\n",
        before.estimated_cost_per_hour, after.estimated_cost_per_hour, deltas.cost_savings_per_hour
    ));
    section.push_str(&format!(
        "| 👥 Occupancy | {} | {} | {:+} |\n",
        before.total_occupancy, after.total_occupancy, deltas.occupancy_delta
    ));
    section.push_str(&format!(
        "| Occupancy Rate | {:.1}% | {:.1}% | {:+.1} pts |\n",
        before.occupancy_rate * 100.0,
        after.occupancy_rate * 100.0,
        deltas.occupancy_rate_delta * 100.0
    ));
    section.push('\n');

    section
}

fn generate_building_deltas_section(result: &ComparisonResult) -> String {
    if result.deltas.buildings.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Building Changes\n\n");
    section.push_str("| Building | Baseline (kW) | Scenario (kW) | Savings | Occupancy |\n");
    section.push_str("|:---------|--------------:|--------------:|--------:|----------:|\n");
    for delta in &result.deltas.buildings {
        section.push_str(&format!(
            "| {} | {:.2} | {:.2} | {:.1}% | {:+} |\n",
            delta.building_id,
            delta.baseline_energy_kw,
            delta.modified_energy_kw,
            delta.energy_savings_pct,
            delta.occupancy_delta
        ));
    }
    section.push('\n');

    section
}

/// Generate a markdown report ranking several scenarios.
pub fn generate_ranking_report(ranking: &ScenarioRanking) -> String {
    let mut output = String::new();

    output.push_str("# 🏆 Scenario Comparison\n\n");
    output.push_str(&format!(
        "- **Scenarios Compared:** {}\n",
        ranking.scenarios_compared
    ));
    match ranking.recommended {
        Some(ref name) => output.push_str(&format!("- **Recommended:** {}\n\n", name)),
        None => output.push_str("- **Recommended:** none\n\n"),
    }

    if ranking.results.is_empty() {
        output.push_str("No scenarios were compared.\n\n");
    } else {
        output.push_str("| Rank | Scenario | Type | Energy Savings | kW Saved | Cost Saved ($/h) |\n");
        output.push_str("|:----:|:---------|:-----|---------------:|---------:|-----------------:|\n");
        for (i, result) in ranking.results.iter().enumerate() {
            output.push_str(&format!(
                "| {} | {} | {} | {:.1}% | {:.2} | {:.2} |\n",
                i + 1,
                result.scenario,
                result.scenario_kind,
                result.deltas.energy_savings_pct,
                result.deltas.energy_savings_kw,
                result.deltas.cost_savings_per_hour
            ));
        }
        output.push('\n');
    }

    output.push_str(&generate_footer());
    output
}

/// Render the scenario templates as a plain-text listing.
pub fn generate_templates_listing(templates: &[ScenarioTemplate]) -> String {
    let mut output = String::new();
    for template in templates {
        output.push_str(&format!("{} ({})\n", template.name, template.id));
        output.push_str(&format!("   type:   {}\n", template.kind));
        output.push_str(&format!("   impact: {}\n", template.estimated_impact));
        output.push_str(&format!("   {}\n\n", template.description));
    }
    output
}

/// Serialize any report payload as pretty JSON.
pub fn generate_json_report<T: Serialize>(payload: &T) -> Result<String> {
    serde_json::to_string_pretty(payload).map_err(Into::into)
}

/// Write a rendered report to disk.
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}
