//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.ecoagent.toml` files.

use crate::analysis::OrchestratorConfig;
use crate::generator::OllamaConfig;
use crate::models::BudgetLevel;
use crate::source::EnvironmentOverlay;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = ".ecoagent.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Insight generator settings.
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Environmental overlay applied to every snapshot before analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<EnvironmentOverlay>,
}

/// Concurrency and deadline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Buildings analyzed concurrently.
    #[serde(default = "default_building_concurrency")]
    pub building_concurrency: usize,

    /// Rooms analyzed concurrently within one building.
    #[serde(default = "default_room_concurrency")]
    pub room_concurrency: usize,

    /// Insight generator calls in flight at once, across all buildings.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Wall-clock limit for one analysis call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_seconds: Option<u64>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            building_concurrency: default_building_concurrency(),
            room_concurrency: default_room_concurrency(),
            max_in_flight: default_max_in_flight(),
            deadline_seconds: None,
        }
    }
}

fn default_building_concurrency() -> usize {
    4
}

fn default_room_concurrency() -> usize {
    8
}

fn default_max_in_flight() -> usize {
    16
}

/// Which insight generator backs the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Deterministic rule engine
    #[default]
    Rules,
    /// Generative model served by Ollama
    Ollama,
}

/// Insight generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub kind: GeneratorKind,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Ollama model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-room generator timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retries after the backend is unavailable.
    #[serde(default = "default_retries")]
    pub retries: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            kind: GeneratorKind::default(),
            ollama_url: default_ollama_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
        }
    }
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    2
}

/// Aggregation and reporting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Buildings above this load are flagged critical.
    #[serde(default = "default_critical_energy")]
    pub critical_energy_kw: f64,

    /// Recommendations kept per building.
    #[serde(default = "default_top_recommendations")]
    pub top_recommendations: usize,

    /// Budget level used when the command line names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_level: Option<BudgetLevel>,

    #[serde(default = "default_energy_price")]
    pub energy_price_per_kwh: f64,

    #[serde(default = "default_water_price")]
    pub water_price_per_liter: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            critical_energy_kw: default_critical_energy(),
            top_recommendations: default_top_recommendations(),
            budget_level: None,
            energy_price_per_kwh: default_energy_price(),
            water_price_per_liter: default_water_price(),
        }
    }
}

fn default_critical_energy() -> f64 {
    50.0
}

fn default_top_recommendations() -> usize {
    3
}

fn default_energy_price() -> f64 {
    0.12
}

fn default_water_price() -> f64 {
    0.002
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given on the command line (or through their env vars)
    /// override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(kind) = args.generator {
            self.generator.kind = kind;
        }
        if let Some(ref model) = args.model {
            self.generator.model = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.generator.ollama_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.generator.timeout_seconds = timeout;
        }

        if let Some(deadline) = args.deadline {
            self.general.deadline_seconds = Some(deadline);
        }
        if let Some(n) = args.building_concurrency {
            self.general.building_concurrency = n;
        }
        if let Some(n) = args.room_concurrency {
            self.general.room_concurrency = n;
        }
        if let Some(n) = args.max_in_flight {
            self.general.max_in_flight = n;
        }

        if let Some(threshold) = args.critical_threshold {
            self.analysis.critical_energy_kw = threshold;
        }
    }

    /// Settings for the Ollama backend.
    pub fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig {
            ollama_url: self.generator.ollama_url.clone(),
            model_name: self.generator.model.clone(),
            temperature: self.generator.temperature,
            timeout_seconds: self.generator.timeout_seconds,
            retries: self.generator.retries,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        Self {
            building_concurrency: config.general.building_concurrency,
            room_concurrency: config.general.room_concurrency,
            max_in_flight: config.general.max_in_flight,
            // One second past the backend's own HTTP timeout
            generator_timeout: Duration::from_secs(config.generator.timeout_seconds + 1),
            deadline: config.general.deadline_seconds.map(Duration::from_secs),
            critical_energy_kw: config.analysis.critical_energy_kw,
            top_recommendations: config.analysis.top_recommendations,
            energy_price_per_kwh: config.analysis.energy_price_per_kwh,
            water_price_per_liter: config.analysis.water_price_per_liter,
        }
    }
}
