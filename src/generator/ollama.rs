//! Generative insight backend served by Ollama.
//!
//! Each room is sent as one JSON-mode chat request; the model answers
//! with a single JSON object that is parsed into [`RoomMetrics`].

use super::InsightGenerator;
use crate::error::GeneratorError;
use crate::models::{RoomMetrics, RoomObservation};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for the Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Extra attempts after an `Unavailable` failure.
    pub retries: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.1,
            timeout_seconds: 30,
            retries: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: String,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

pub struct OllamaGenerator {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: OllamaConfig) -> Result<Self, GeneratorError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| GeneratorError::Unavailable(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    async fn send_prompt(&self, prompt: &str) -> Result<String, GeneratorError> {
        let url = format!("{}/api/chat", self.config.ollama_url.trim_end_matches('/'));

        let request = OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            format: "json".to_string(),
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeneratorError::Timeout(Duration::from_secs(self.config.timeout_seconds))
                } else if e.is_connect() {
                    GeneratorError::Unavailable(format!(
                        "cannot connect to Ollama at {}",
                        self.config.ollama_url
                    ))
                } else {
                    GeneratorError::Unavailable(format!("failed to send request: {}", e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Unavailable(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        let chat_response: OllamaChatResponse = response.json().await.map_err(|e| {
            GeneratorError::MalformedResponse(format!("failed to parse Ollama response: {}", e))
        })?;

        Ok(chat_response.message.content)
    }
}

#[async_trait]
impl InsightGenerator for OllamaGenerator {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn generate(&self, room: &RoomObservation) -> Result<RoomMetrics, GeneratorError> {
        let prompt = build_prompt(room);
        let mut attempt = 0;
        loop {
            match self.send_prompt(&prompt).await {
                Ok(content) => {
                    debug!("Ollama answered for room {}", room.room_id);
                    return parse_metrics(&content);
                }
                Err(GeneratorError::Unavailable(reason)) if attempt < self.config.retries => {
                    attempt += 1;
                    warn!(
                        "Ollama unavailable for room {} (attempt {}): {}",
                        room.room_id, attempt, reason
                    );
                    tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Render the observation into the user prompt.
pub(crate) fn build_prompt(room: &RoomObservation) -> String {
    let mut prompt = String::new();
    prompt.push_str("Estimate the resource usage of this room.\n\n");
    prompt.push_str(&format!("Room: {}\n", room.room_id));
    prompt.push_str(&format!("Building: {}\n", room.building_id));
    prompt.push_str(&format!("Type: {}\n", room.room_type));
    prompt.push_str(&format!(
        "Occupancy: {} / {} ({:.0}%)\n",
        room.clamped_occupancy(),
        room.capacity,
        room.occupancy_ratio() * 100.0
    ));
    let equipment: Vec<&str> = room.equipment_running.iter().map(String::as_str).collect();
    if equipment.is_empty() {
        prompt.push_str("Equipment running: none\n");
    } else {
        prompt.push_str(&format!("Equipment running: {}\n", equipment.join(", ")));
    }
    prompt.push_str(&format!(
        "Temperature comfort: {:?}\n",
        room.temperature_comfort
    ));
    if let Some(time_of_day) = room.time_of_day {
        prompt.push_str(&format!("Time of day: {}\n", time_of_day));
    }
    prompt.push_str(&format!("Water running: {}\n\n", room.water_running));
    prompt.push_str("Respond with a single JSON object:\n");
    prompt.push_str(r#"{"estimated_energy_kw": 3.2, "estimated_water_lph": 0.0, "estimated_co2_ppm": 620, "recommendations": ["..."], "anomalies": ["..."], "savings_potential": 25.0}"#);
    prompt
}

/// Parse the model's answer, tolerating code fences and surrounding prose.
pub(crate) fn parse_metrics(content: &str) -> Result<RoomMetrics, GeneratorError> {
    let trimmed = content.trim();
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &trimmed[s..=e],
        _ => {
            return Err(GeneratorError::MalformedResponse(
                "response contains no JSON object".to_string(),
            ))
        }
    };

    serde_json::from_str::<RoomMetrics>(json)
        .map_err(|e| GeneratorError::MalformedResponse(format!("invalid metrics JSON: {}", e)))
}

const SYSTEM_PROMPT: &str = r#"You are an energy analyst for a university campus.
Given one room's occupancy and running equipment, estimate its energy (kW), water (liters/hour) and CO2 (ppm).
List recommendations most impactful first and any anomalies you notice.
Only output valid JSON, no explanations or markdown."#;
