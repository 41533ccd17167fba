use musli::json;
use musli::{Decode, Encode};
use reqwest::blocking::Client;
use std::time::Duration;

use crate::config::AiConfig;

use super::error::LlmError;
use super::prompt_builder::PromptPair;
use super::retry::{CancelToken, JitterSource, RandJitter, RetryPolicy};
use super::Provider;

pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

#[derive(Debug, Decode)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Decode)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

/// Synchronous Ollama client using /api/chat. No credential required; a
/// local daemon answers unauthenticated.
#[derive(Debug)]
pub struct OllamaClient {
    http: Client,
    base_url: String,
    model: String,
    retry: RetryPolicy,
    jitter: Box<dyn JitterSource>,
}

impl OllamaClient {
    pub fn from_config(cfg: &AiConfig) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| OLLAMA_BASE_URL.to_string());

        OllamaClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: cfg.model.clone(),
            retry: RetryPolicy::default(),
            jitter: Box::new(RandJitter),
        }
    }

    /// Internal helper to talk to /api/chat.
    fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        // Request structs we encode with musli::json.
        #[derive(Debug, Encode)]
        struct ChatMessage {
            role: String,
            content: String,
        }

        #[derive(Debug, Encode)]
        struct ChatRequest {
            model: String,
            stream: bool,
            messages: Vec<ChatMessage>,
        }

        let req_body = ChatRequest {
            model: self.model.clone(),
            stream: false,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
        };

        let body_str = json::to_string(&req_body)
            .map_err(|e| LlmError::MalformedRequest(e.to_string()))?;

        log::trace!("ollama request body: {body_str}");

        let url = format!("{}/api/chat", self.base_url);

        let resp = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body_str)
            .send()
            .map_err(LlmError::from_reqwest)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(LlmError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let resp_text = resp.text().map_err(LlmError::from_reqwest)?;
        log::trace!("ollama raw JSON response: {resp_text}");

        let parsed: OllamaChatResponse = json::from_str(&resp_text)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        log::debug!("ollama reply role={:?}", parsed.message.role);

        Ok(parsed.message.content)
    }
}

impl Provider for OllamaClient {
    fn name(&self) -> &str {
        "ollama"
    }

    fn validate_config(&self) -> Result<(), LlmError> {
        if self.model.trim().is_empty() {
            return Err(LlmError::Config("ai.model is required".to_string()));
        }
        Ok(())
    }

    fn generate(&self, cancel: &CancelToken, prompt: &PromptPair) -> Result<String, LlmError> {
        self.retry.run(cancel, self.jitter.as_ref(), || {
            self.chat(&prompt.system, &prompt.user)
        })
    }
}
