//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::GeneratorKind;
use crate::models::{BudgetLevel, BudgetPolicy};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// EcoAgent - campus energy analysis and what-if simulation
///
/// Analyze room observations building by building, flag critical
/// buildings, and compare operational scenarios by energy savings.
///
/// Examples:
///   ecoagent analyze --snapshot campus.json
///   ecoagent analyze --snapshot campus.json --budget low --format json
///   ecoagent simulate --snapshot campus.json --scenario close_library.json
///   ecoagent compare --snapshot campus.json --scenarios scenarios.json
///   ecoagent init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .ecoagent.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Insight generator backend
    #[arg(long, value_name = "KIND", global = true, env = "ECOAGENT_GENERATOR")]
    pub generator: Option<GeneratorKind>,

    /// Ollama model used by the ollama generator
    #[arg(short, long, global = true, env = "ECOAGENT_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, value_name = "URL", global = true, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Per-room generator timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Deadline for one analysis call in seconds
    ///
    /// Rooms still running when it passes are reported as cancelled.
    #[arg(long, value_name = "SECS", global = true)]
    pub deadline: Option<u64>,

    /// Buildings analyzed concurrently
    #[arg(long, value_name = "NUM", global = true)]
    pub building_concurrency: Option<usize>,

    /// Rooms analyzed concurrently within one building
    #[arg(long, value_name = "NUM", global = true)]
    pub room_concurrency: Option<usize>,

    /// Generator calls in flight at once across the campus
    #[arg(long, value_name = "NUM", global = true)]
    pub max_in_flight: Option<usize>,

    /// Energy (kW) above which a building is flagged critical
    #[arg(long, value_name = "KW", global = true)]
    pub critical_threshold: Option<f64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Analyze a campus snapshot
    Analyze {
        #[command(flatten)]
        input: SnapshotArgs,

        #[command(flatten)]
        budget: BudgetArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Exit with code 2 when any building is critical
        ///
        /// Useful for scheduled jobs that alert on overloaded buildings.
        #[arg(long)]
        fail_on_critical: bool,
    },

    /// Simulate one scenario against the current snapshot
    Simulate {
        #[command(flatten)]
        input: SnapshotArgs,

        /// Scenario JSON file
        #[arg(long, value_name = "FILE")]
        scenario: PathBuf,

        #[command(flatten)]
        budget: BudgetArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Simulate several scenarios and rank them by energy savings
    Compare {
        #[command(flatten)]
        input: SnapshotArgs,

        /// JSON file holding a list of scenarios
        #[arg(long, value_name = "FILE")]
        scenarios: PathBuf,

        #[command(flatten)]
        budget: BudgetArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the built-in scenario templates
    Templates,

    /// Generate a default .ecoagent.toml configuration file
    InitConfig {
        /// Where to write the file
        #[arg(short, long, default_value = ".ecoagent.toml", value_name = "FILE")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SnapshotArgs {
    /// Campus snapshot JSON file
    #[arg(short, long, value_name = "FILE")]
    pub snapshot: PathBuf,

    /// Skip the [environment] overlay from the config file
    #[arg(long)]
    pub raw: bool,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct BudgetArgs {
    /// Named analysis budget (low=10 rooms/2 buildings, medium=30/4, high=all)
    #[arg(long, value_name = "LEVEL")]
    pub budget: Option<BudgetArg>,

    /// Maximum rooms analyzed (overrides the level)
    #[arg(long, value_name = "COUNT")]
    pub max_rooms: Option<usize>,

    /// Maximum buildings analyzed (overrides the level)
    #[arg(long, value_name = "COUNT")]
    pub max_buildings: Option<usize>,
}

impl BudgetArgs {
    /// Build the budget policy, falling back to `default_level`.
    pub fn policy(&self, default_level: Option<BudgetLevel>) -> BudgetPolicy {
        BudgetPolicy {
            level: self.budget.map(BudgetLevel::from).or(default_level),
            max_rooms: self.max_rooms,
            max_buildings: self.max_buildings,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_rooms == Some(0) {
            return Err("Max rooms must be at least 1".to_string());
        }
        if self.max_buildings == Some(0) {
            return Err("Max buildings must be at least 1".to_string());
        }
        Ok(())
    }
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct OutputArgs {
    /// Output file path for the report
    ///
    /// Defaults to ecoagent_report.md (or .json with --format json)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,
}

impl OutputArgs {
    /// The report path, defaulting by format.
    pub fn path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| match self.format {
            OutputFormat::Markdown => PathBuf::from("ecoagent_report.md"),
            OutputFormat::Json => PathBuf::from("ecoagent_report.json"),
        })
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// Budget level accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BudgetArg {
    Low,
    Medium,
    High,
}

impl From<BudgetArg> for BudgetLevel {
    fn from(arg: BudgetArg) -> Self {
        match arg {
            BudgetArg::Low => BudgetLevel::Low,
            BudgetArg::Medium => BudgetLevel::Medium,
            BudgetArg::High => BudgetLevel::High,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate Ollama URL format
        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        for (name, value) in [
            ("Building concurrency", self.building_concurrency),
            ("Room concurrency", self.room_concurrency),
            ("Max in flight", self.max_in_flight),
        ] {
            if value == Some(0) {
                return Err(format!("{} must be at least 1", name));
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }
        if self.deadline == Some(0) {
            return Err("Deadline must be at least 1 second".to_string());
        }

        if let Some(threshold) = self.critical_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err("Critical threshold must be a non-negative number".to_string());
            }
        }

        match &self.command {
            Command::Analyze { input, budget, .. } => {
                check_file(&input.snapshot, "Snapshot")?;
                budget.validate()?;
            }
            Command::Simulate {
                input,
                scenario,
                budget,
                ..
            } => {
                check_file(&input.snapshot, "Snapshot")?;
                check_file(scenario, "Scenario")?;
                budget.validate()?;
            }
            Command::Compare {
                input,
                scenarios,
                budget,
                ..
            } => {
                check_file(&input.snapshot, "Snapshot")?;
                check_file(scenarios, "Scenario")?;
                budget.validate()?;
            }
            Command::Templates | Command::InitConfig { .. } => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn check_file(path: &Path, what: &str) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("{} file does not exist: {}", what, path.display()));
    }
    if !path.is_file() {
        return Err(format!("{} path is not a file: {}", what, path.display()));
    }
    Ok(())
}
