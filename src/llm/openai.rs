use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AiConfig;

use super::error::LlmError;
use super::prompt_builder::PromptPair;
use super::resolver::{self, CredentialSource};
use super::retry::{CancelToken, JitterSource, RandJitter, RetryPolicy};
use super::{Provider, truncate};

/// One blocking round trip per request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

/// Wire-level role/content pair, shared by requests and responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request envelope for POST {base}/chat/completions. Optional fields are
/// omitted entirely when unset; they are never serialized as null.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    object: String,
    #[serde(default)]
    created: u64,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    /// Some backends report failures in-band on a 2xx status.
    #[serde(default)]
    error: Option<ApiError>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    finish_reason: String,
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

/// Client for any OpenAI-compatible chat-completions backend.
///
/// Immutable once constructed; a new configuration means a new client.
#[derive(Debug)]
pub struct OpenAiClient {
    client: Client,
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    retry: RetryPolicy,
    jitter: Box<dyn JitterSource>,
}

impl OpenAiClient {
    /// Resolve endpoint and credential from config + provider defaults.
    ///
    /// Explicit overrides win over the provider table. Fails before any
    /// network activity when the resolved env var holds no key.
    pub fn from_config(
        cfg: &AiConfig,
        creds: &dyn CredentialSource,
    ) -> Result<Self, LlmError> {
        let key_env = cfg
            .api_key_env
            .as_deref()
            .unwrap_or_else(|| resolver::default_api_key_env(&cfg.provider));
        let api_key = creds
            .get(key_env)
            .ok_or_else(|| LlmError::MissingCredential(key_env.to_string()))?;

        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| resolver::default_base_url(&cfg.provider));

        let name = match cfg.provider.trim() {
            "" => "openai".to_string(),
            other => other.to_ascii_lowercase(),
        };

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");

        Ok(OpenAiClient {
            client,
            name,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            retry: RetryPolicy::default(),
            jitter: Box::new(RandJitter),
        })
    }

    /// Replace the retry policy (tests shrink the delays).
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the jitter source (tests pin it).
    pub fn with_jitter(mut self, jitter: Box<dyn JitterSource>) -> Self {
        self.jitter = jitter;
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Exactly one network round trip: serialize, POST, decode, return the
    /// first completion's text unmodified. Retrying belongs to the caller.
    pub fn send(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = self.chat_url();
        let req = ChatRequest {
            model: &self.model,
            messages,
            temperature: (self.temperature != 0.0).then_some(self.temperature),
            max_tokens: (self.max_tokens != 0).then_some(self.max_tokens),
        };

        log::info!("calling {} (model {:?})", url, self.model);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
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

        let body = resp.text().map_err(LlmError::from_reqwest)?;
        log::trace!("raw chat response: {body}");

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        if let Some(err) = parsed.error {
            return Err(LlmError::Api(err.message));
        }

        log::debug!(
            "chat response id={:?} object={:?} created={}",
            parsed.id,
            parsed.object,
            parsed.created
        );
        if let Some(usage) = &parsed.usage {
            log::info!(
                "token usage: prompt={}, completion={}, total={}",
                usage.prompt_tokens,
                usage.completion_tokens,
                usage.total_tokens
            );
        }

        if let Some(first) = parsed.choices.first() {
            log::debug!(
                "choice {} finish_reason={:?}",
                first.index,
                first.finish_reason
            );
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        Ok(content)
    }
}

impl Provider for OpenAiClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate_config(&self) -> Result<(), LlmError> {
        if self.model.trim().is_empty() {
            return Err(LlmError::Config("ai.model is required".to_string()));
        }
        Ok(())
    }

    fn generate(&self, cancel: &CancelToken, prompt: &PromptPair) -> Result<String, LlmError> {
        log::debug!("system prompt:\n{}", truncate(&prompt.system, 2000));
        log::debug!("user prompt:\n{}", truncate(&prompt.user, 3000));

        let messages = [
            ChatMessage::system(prompt.system.clone()),
            ChatMessage::user(prompt.user.clone()),
        ];

        self.retry
            .run(cancel, self.jitter.as_ref(), || self.send(&messages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn creds(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base_cfg() -> AiConfig {
        AiConfig::default()
    }

    #[test]
    fn missing_credential_names_the_variable() {
        let err = OpenAiClient::from_config(&base_cfg(), &creds(&[])).unwrap_err();
        match err {
            LlmError::MissingCredential(var) => assert_eq!(var, "OPENAI_API_KEY"),
            other => panic!("expected MissingCredential, got {other:?}"),
        }

        let cfg = AiConfig {
            provider: "openrouter".to_string(),
            ..base_cfg()
        };
        let err = OpenAiClient::from_config(&cfg, &creds(&[])).unwrap_err();
        assert_eq!(err.to_string(), "missing API key; set OPENROUTER_API_KEY");
    }

    #[test]
    fn key_env_override_beats_provider_default() {
        let cfg = AiConfig {
            api_key_env: Some("MY_GATEWAY_KEY".to_string()),
            ..base_cfg()
        };
        let client =
            OpenAiClient::from_config(&cfg, &creds(&[("MY_GATEWAY_KEY", "k-123")])).unwrap();
        assert_eq!(client.api_key, "k-123");
    }

    #[test]
    fn base_url_override_wins_and_trailing_slash_is_stripped() {
        let cfg = AiConfig {
            base_url: Some("https://proxy.internal/v1/".to_string()),
            ..base_cfg()
        };
        let client =
            OpenAiClient::from_config(&cfg, &creds(&[("OPENAI_API_KEY", "k")])).unwrap();
        assert_eq!(client.base_url, "https://proxy.internal/v1");
        assert_eq!(client.chat_url(), "https://proxy.internal/v1/chat/completions");
    }

    #[test]
    fn unknown_provider_becomes_the_base_url() {
        let cfg = AiConfig {
            provider: "https://llm.example.com/api".to_string(),
            ..base_cfg()
        };
        let client =
            OpenAiClient::from_config(&cfg, &creds(&[("OPENAI_API_KEY", "k")])).unwrap();
        assert_eq!(client.base_url, "https://llm.example.com/api");
    }

    #[test]
    fn unset_optionals_are_omitted_from_the_wire() {
        let messages = [ChatMessage::user("hi")];
        let req = ChatRequest {
            model: "m",
            messages: &messages,
            temperature: None,
            max_tokens: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("temperature"));
        assert!(!obj.contains_key("max_tokens"));

        let req = ChatRequest {
            model: "m",
            messages: &messages,
            temperature: Some(0.5),
            max_tokens: Some(256),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["temperature"], serde_json::json!(0.5));
        assert_eq!(value["max_tokens"], serde_json::json!(256));
    }

    #[test]
    fn empty_choices_decode_to_a_protocol_error() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"id":"x","object":"chat.completion","created":1,"choices":[]}"#,
        )
        .unwrap();
        assert!(parsed.choices.is_empty());
        assert!(parsed.error.is_none());
    }
}
