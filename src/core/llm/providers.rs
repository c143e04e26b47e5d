use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{HierarchyError, Result};
use crate::config::LlmConfig;
use super::refiner::{RefinementRequest, RefinementSuggestion, SubprocessRefiner};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Factory function to create the configured refiner
pub fn create_refiner(config: &LlmConfig) -> Result<Box<dyn SubprocessRefiner>> {
    if !config.enabled {
        return Err(HierarchyError::Config("LLM refinement is disabled".to_string()));
    }

    match config.provider.as_str() {
        "openai" | "openai-compatible" | "ollama" => Ok(Box::new(OpenAiRefiner::new(config)?)),
        _ => Err(HierarchyError::Config(format!(
            "Unsupported LLM provider: {}",
            config.provider
        ))),
    }
}

/// Refiner backed by an OpenAI-style chat completions endpoint
pub struct OpenAiRefiner {
    config: LlmConfig,
    base_url: String,
    display_name: String,
    client: reqwest::Client,
}

impl OpenAiRefiner {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let local = config.provider == "ollama";

        // Validate configuration
        if config.api_key.is_none() && !local {
            return Err(HierarchyError::Config(
                "API key required for external LLM providers".to_string(),
            ));
        }
        if config.provider == "openai-compatible" && config.base_url.is_none() {
            return Err(HierarchyError::Config(
                "base_url required for openai-compatible providers".to_string(),
            ));
        }

        let default_url = if local { OLLAMA_BASE_URL } else { OPENAI_BASE_URL };
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| default_url.to_string());

        Ok(Self {
            config: config.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            display_name: format!("{} {}", config.provider, config.model),
            client: reqwest::Client::new(),
        })
    }

    async fn call_chat_api(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You match BPMN call activities to the BPMN file that implements the called subprocess. Answer with a single JSON object and nothing else."
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "response_format": { "type": "json_object" },
            "max_tokens": self.config.max_tokens.unwrap_or(500),
            "temperature": self.config.temperature.unwrap_or(0.0)
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json")
            .json(&payload);
        if let Some(api_key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| HierarchyError::Refinement(format!("Chat request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(HierarchyError::Refinement(format!(
                "Chat API error {}: {}",
                status, error_text
            )));
        }

        let response_data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| HierarchyError::Refinement(format!("Failed to parse chat response: {}", e)))?;

        if let Some(usage) = response_data.get("usage") {
            debug!("Chat tokens used: {}", usage["total_tokens"]);
        }

        response_data["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| HierarchyError::Refinement("Chat response carried no content".to_string()))
    }
}

#[async_trait]
impl SubprocessRefiner for OpenAiRefiner {
    async fn refine(&self, request: RefinementRequest) -> Result<RefinementSuggestion> {
        let prompt = build_refinement_prompt(&request);
        let content = self.call_chat_api(&prompt).await?;
        parse_suggestion(&content)
    }

    fn provider_name(&self) -> &str {
        &self.display_name
    }
}

fn build_refinement_prompt(request: &RefinementRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "A call activity in {} needs to be linked to the BPMN file of its subprocess.\n\n",
        request.owning_file
    ));
    prompt.push_str(&format!("Call activity id: {}\n", request.call_activity_id));
    if let Some(name) = &request.call_activity_name {
        prompt.push_str(&format!("Call activity name: {}\n", name));
    }
    if let Some(called) = &request.called_element {
        prompt.push_str(&format!("calledElement: {}\n", called));
    }
    if let Some(current) = &request.current_file {
        prompt.push_str(&format!("Current low-confidence guess: {}\n", current));
    }

    prompt.push_str("\nCandidate files:\n");
    for file in &request.candidate_files {
        prompt.push_str(&format!("- {}\n", file));
    }

    prompt.push_str(
        "\nRespond with {\"file\": <one candidate file name or null>, \"confidence\": <0.0 to 1.0>, \"rationale\": <one sentence>}.\n",
    );
    prompt
}

#[derive(Deserialize)]
struct RawSuggestion {
    file: Option<String>,
    confidence: f32,
    #[serde(default)]
    rationale: Option<String>,
}

/// Extract the JSON answer, tolerating prose or code fences around it
fn parse_suggestion(content: &str) -> Result<RefinementSuggestion> {
    let start = content.find('{');
    let end = content.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => {
            return Err(HierarchyError::Refinement(format!(
                "No JSON object in response: {}",
                content
            )))
        }
    };

    let raw: RawSuggestion = serde_json::from_str(json)
        .map_err(|e| HierarchyError::Refinement(format!("Malformed suggestion: {}", e)))?;

    Ok(RefinementSuggestion {
        suggested_file: raw.file.filter(|file| !file.trim().is_empty()),
        confidence: raw.confidence.clamp(0.0, 1.0),
        rationale: raw.rationale,
    })
}
