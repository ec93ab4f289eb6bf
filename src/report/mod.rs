//! Report generation module.
//!
//! Renders analysis, simulation and comparison results as markdown or JSON.

mod generator;

pub use generator::{
    generate_comparison_report, generate_json_report, generate_markdown_report,
    generate_ranking_report, generate_templates_listing, write_report,
};
