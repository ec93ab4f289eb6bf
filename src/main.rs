//! EcoAgent - campus energy analysis and what-if simulation
//!
//! A CLI tool that estimates room-level energy and water use, rolls it up
//! per building and campus-wide, and ranks operational scenarios.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad snapshot, invalid scenario, generator setup, etc.)
//!   2 - Critical buildings found with --fail-on-critical

use anyhow::{bail, Context, Result};
use ecoagent::cli::{Args, BudgetArgs, Command, OutputArgs, OutputFormat, SnapshotArgs};
use ecoagent::config::{Config, GeneratorKind};
use ecoagent::models::{BudgetPolicy, CampusInsight, CampusSnapshot};
use ecoagent::source::{load_scenarios, load_snapshot};
use ecoagent::{
    report, scenario, CampusOrchestrator, InsightGenerator, OllamaGenerator, OrchestratorConfig,
    RuleBasedGenerator,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Commands that need neither logging nor a generator
    match args.command {
        Command::InitConfig { ref output, force } => return handle_init_config(output, force),
        Command::Templates => {
            print!("{}", report::generate_templates_listing(&scenario::templates()));
            return Ok(());
        }
        _ => {}
    }

    init_logging(&args);

    info!("EcoAgent v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle `init-config`: write a default .ecoagent.toml.
fn handle_init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        eprintln!(
            "⚠️  {} already exists. Use --force to overwrite it.",
            path.display()
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("✅ Created {} with default settings.", path.display());
    println!("   Edit it to choose the generator, budget, prices and environment.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run one analysis command. Returns the exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let generator = build_generator(&config)?;
    println!("🤖 Generator: {}", generator.name());
    if config.generator.kind == GeneratorKind::Ollama {
        println!("   Model: {}", config.generator.model);
        println!("   Ollama: {}", config.generator.ollama_url);
    }

    let orchestrator = CampusOrchestrator::new(generator, OrchestratorConfig::from(&config));
    let default_level = config.analysis.budget_level;

    match args.command {
        Command::Analyze {
            input,
            budget,
            output,
            fail_on_critical,
        } => {
            let snapshot = prepare_snapshot(&input, &config)?;
            let policy = budget_policy(&budget, default_level);

            let progress = spinner(args.quiet, "Analyzing campus...");
            let insight = orchestrator.analyze(&snapshot, &policy).await;
            progress.finish_and_clear();
            let insight = insight?;

            let rendered = match output.format {
                OutputFormat::Json => report::generate_json_report(&insight)?,
                OutputFormat::Markdown => report::generate_markdown_report(&insight),
            };
            save(&output, &rendered)?;
            print_summary(&insight);

            if fail_on_critical && !insight.critical_buildings.is_empty() {
                eprintln!(
                    "\n⛔ {} critical building(s) found. Failing (exit code 2).",
                    insight.critical_buildings.len()
                );
                return Ok(2);
            }
        }

        Command::Simulate {
            input,
            scenario,
            budget,
            output,
        } => {
            let snapshot = prepare_snapshot(&input, &config)?;
            let policy = budget_policy(&budget, default_level);
            let mut scenarios = load_scenarios(&scenario)?;
            if scenarios.is_empty() {
                bail!("No scenario found in {}", scenario.display());
            }
            if scenarios.len() > 1 {
                warn!(
                    "{} holds {} scenarios; simulating only the first (use `compare` for all)",
                    scenario.display(),
                    scenarios.len()
                );
            }
            let scenario = scenarios.swap_remove(0);

            let progress = spinner(args.quiet, &format!("Simulating '{}'...", scenario.name()));
            let result = orchestrator.simulate(&scenario, &snapshot, &policy).await;
            progress.finish_and_clear();
            let result = result?;

            let rendered = match output.format {
                OutputFormat::Json => report::generate_json_report(&result)?,
                OutputFormat::Markdown => report::generate_comparison_report(&result),
            };
            save(&output, &rendered)?;

            println!("\n🔬 Scenario: {} ({})", result.scenario, result.scenario_kind);
            println!(
                "   ⚡ Energy: {:.2} kW -> {:.2} kW ({:.1}% savings)",
                result.baseline.metrics.total_energy_kw,
                result.modified.metrics.total_energy_kw,
                result.deltas.energy_savings_pct
            );
            println!(
                "   💰 Cost savings: ${:.2}/h",
                result.deltas.cost_savings_per_hour
            );
            println!("   👥 Occupancy change: {:+}", result.deltas.occupancy_delta);
        }

        Command::Compare {
            input,
            scenarios,
            budget,
            output,
        } => {
            let snapshot = prepare_snapshot(&input, &config)?;
            let policy = budget_policy(&budget, default_level);
            let scenarios = load_scenarios(&scenarios)?;

            let progress = spinner(
                args.quiet,
                &format!("Comparing {} scenarios...", scenarios.len()),
            );
            let ranking = orchestrator.compare_many(&scenarios, &snapshot, &policy).await;
            progress.finish_and_clear();
            let ranking = ranking?;

            let rendered = match output.format {
                OutputFormat::Json => report::generate_json_report(&ranking)?,
                OutputFormat::Markdown => report::generate_ranking_report(&ranking),
            };
            save(&output, &rendered)?;

            println!("\n🏆 Scenario ranking:");
            for (i, result) in ranking.results.iter().enumerate() {
                println!(
                    "   {}. {} - {:.1}% savings ({:.2} kW)",
                    i + 1,
                    result.scenario,
                    result.deltas.energy_savings_pct,
                    result.deltas.energy_savings_kw
                );
            }
            if let Some(ref best) = ranking.recommended {
                println!("   Recommended: {}", best);
            }
        }

        Command::Templates | Command::InitConfig { .. } => {}
    }

    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .ecoagent.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

fn build_generator(config: &Config) -> Result<Arc<dyn InsightGenerator>> {
    Ok(match config.generator.kind {
        GeneratorKind::Rules => Arc::new(RuleBasedGenerator::new()),
        GeneratorKind::Ollama => Arc::new(
            OllamaGenerator::new(config.ollama_config())
                .context("Failed to set up the Ollama generator")?,
        ),
    })
}

/// Load the snapshot and apply the configured environment unless `--raw`.
fn prepare_snapshot(input: &SnapshotArgs, config: &Config) -> Result<CampusSnapshot> {
    println!("📥 Loading snapshot: {}", input.snapshot.display());
    let snapshot = load_snapshot(&input.snapshot)?;

    match config.environment {
        Some(ref overlay) if !input.raw => {
            info!("Applying environment overlay from config");
            Ok(overlay.apply(&snapshot))
        }
        _ => Ok(snapshot),
    }
}

fn budget_policy(budget: &BudgetArgs, default_level: Option<ecoagent::BudgetLevel>) -> BudgetPolicy {
    let policy = budget.policy(default_level);
    debug!("Budget: {}", policy.effective());
    policy
}

fn spinner(quiet: bool, message: &str) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn save(output: &OutputArgs, rendered: &str) -> Result<()> {
    let path = output.path();
    report::write_report(&path, rendered)?;
    println!("\n✅ Report saved to: {}", path.display());
    Ok(())
}

fn print_summary(insight: &CampusInsight) {
    let metrics = &insight.metrics;
    let execution = &insight.execution;

    println!("\n📊 Campus Summary:");
    println!(
        "   Buildings: {} | Rooms: {}/{} analyzed",
        execution.buildings_analyzed, execution.rooms_succeeded, execution.rooms_attempted
    );
    println!("   ⚡ Energy: {:.2} kW", metrics.total_energy_kw);
    println!("   💧 Water: {:.1} L/h", metrics.total_water_lph);
    println!(
        "   👥 Occupancy: {:.1}% | 💰 ${:.2}/h",
        metrics.occupancy_rate * 100.0,
        metrics.estimated_cost_per_hour
    );
    if execution.rooms_failed() > 0 {
        println!("   ⚠️  {} room(s) failed", execution.rooms_failed());
    }
    for critical in &insight.critical_buildings {
        println!("   🔴 {}: {}", critical.building_id, critical.reason);
    }
    println!("   Duration: {:.1}s", execution.duration_ms as f64 / 1000.0);
}
