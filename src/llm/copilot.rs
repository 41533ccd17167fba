//! GitHub Copilot-style backend.
//!
//! Shares the chat request/response shape with the OpenAI-compatible client
//! but speaks GitHub's header dialect: `Authorization: token <tok>` instead of a
//! bearer credential, a pinned API-version header, and a vendor media type in
//! `Accept`. The endpoint is not wired up yet: `generate` refuses instead
//! of calling out, while `validate_config` still checks the configuration.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

use crate::config::AiConfig;

use super::error::LlmError;
use super::prompt_builder::PromptPair;
use super::resolver::CredentialSource;
use super::retry::CancelToken;
use super::Provider;

pub const COPILOT_BASE_URL: &str = "https://api.githubcopilot.com";

/// Token env var, with the generic GitHub token as fallback.
pub const COPILOT_TOKEN_ENV: &str = "COPILOT_API_TOKEN";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

const API_VERSION_HEADER: &str = "x-github-api-version";
const API_VERSION: &str = "2022-11-28";
const ACCEPT_MEDIA_TYPE: &str = "application/vnd.github+json";

#[derive(Debug)]
pub struct CopilotClient {
    base_url: String,
    token: Option<String>,
    model: String,
}

impl CopilotClient {
    /// A missing token is not an error here: Copilot authenticates through
    /// the GitHub device flow, so the credential may arrive later.
    pub fn from_config(cfg: &AiConfig, creds: &dyn CredentialSource) -> Self {
        let token = match cfg.api_key_env.as_deref() {
            Some(var) => creds.get(var),
            None => creds
                .get(COPILOT_TOKEN_ENV)
                .or_else(|| creds.get(GITHUB_TOKEN_ENV)),
        };

        let base_url = cfg
            .base_url
            .clone()
            .unwrap_or_else(|| COPILOT_BASE_URL.to_string());

        CopilotClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            model: cfg.model.clone(),
        }
    }

    /// Header set the chat call will use once the endpoint is wired up.
    fn chat_headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_MEDIA_TYPE));
        headers.insert(
            API_VERSION_HEADER,
            HeaderValue::from_static(API_VERSION),
        );

        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("token {token}"))
                .map_err(|_| {
                    LlmError::Config(
                        "copilot token contains characters not valid in a header".to_string(),
                    )
                })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

impl Provider for CopilotClient {
    fn name(&self) -> &str {
        "copilot"
    }

    fn validate_config(&self) -> Result<(), LlmError> {
        if self.model.trim().is_empty() {
            return Err(LlmError::Config("ai.model is required".to_string()));
        }
        if self.base_url.is_empty() {
            return Err(LlmError::Config("copilot base URL is empty".to_string()));
        }
        self.chat_headers().map(|_| ())
    }

    fn generate(&self, _cancel: &CancelToken, _prompt: &PromptPair) -> Result<String, LlmError> {
        Err(LlmError::NotImplemented {
            provider: "copilot",
            reason: "waiting on GitHub device-flow authentication support",
        })
    }
}
