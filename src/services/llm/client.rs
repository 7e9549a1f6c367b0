use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::oracle::{Generation, TextOracle};
use crate::config::HeartflowConfig;
use crate::error::HeartflowError;

/// Oracle backed by the `/completion` endpoint of llama-server.
#[derive(Clone)]
pub struct LLMService {
    client: Client,
    base_url: String,
    n_predict: usize,
    temperature: f32,
    request_type: &'static str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    stream: bool,
    n_predict: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
    // Reasoning models served behind an OpenAI-ish shim put their trace here
    #[serde(default)]
    reasoning_content: Option<String>,
}

impl LLMService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HeartflowError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            n_predict: 1000,
            temperature: 0.6,
            request_type: "heart_flow",
        })
    }

    /// Thinking model: used by the global mind and sub-mind monologues.
    pub fn for_thinking(config: &HeartflowConfig) -> Result<Self, HeartflowError> {
        Ok(Self::new(&config.llm_url, Duration::from_secs(config.llm_timeout_secs))?
            .with_sampling(config.max_tokens, config.think_temperature)
            .with_request_type("heart_flow"))
    }

    /// Planning model: used by every action planner.
    pub fn for_planning(config: &HeartflowConfig) -> Result<Self, HeartflowError> {
        Ok(Self::new(&config.llm_url, Duration::from_secs(config.llm_timeout_secs))?
            .with_sampling(config.max_tokens, config.plan_temperature)
            .with_request_type("action_planning"))
    }

    pub fn with_sampling(mut self, n_predict: usize, temperature: f32) -> Self {
        self.n_predict = n_predict;
        self.temperature = temperature;
        self
    }

    pub fn with_request_type(mut self, request_type: &'static str) -> Self {
        self.request_type = request_type;
        self
    }
}

#[async_trait]
impl TextOracle for LLMService {
    async fn generate(&self, prompt: &str) -> Result<Generation, HeartflowError> {
        let request_body = CompletionRequest {
            prompt,
            stream: false,
            n_predict: self.n_predict,
            temperature: self.temperature,
        };

        tracing::debug!(request_type = self.request_type, "sending completion request");

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HeartflowError::Oracle(format!(
                "LLM server error ({}): {}",
                self.request_type,
                response.status()
            )));
        }

        let resp_json: CompletionResponse = response.json().await?;
        Ok(Generation {
            text: resp_json.content.trim().to_string(),
            trace: resp_json.reasoning_content.unwrap_or_default(),
        })
    }
}
