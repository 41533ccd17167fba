use log::debug;

use crate::config::AiConfig;
use crate::llm::Provider;
use crate::llm::copilot::CopilotClient;
use crate::llm::error::LlmError;
use crate::llm::ollama::OllamaClient;
use crate::llm::openai::OpenAiClient;
use crate::llm::resolver::CredentialSource;

/// Build the provider backend selected by the config.
///
/// Anything that is not a named variant falls through to the generic
/// OpenAI-compatible client, whose resolver treats unknown provider
/// strings as a literal base URL.
pub fn build_provider(
    cfg: &AiConfig,
    creds: &dyn CredentialSource,
) -> Result<Box<dyn Provider>, LlmError> {
    let provider = cfg.provider.trim().to_ascii_lowercase();
    debug!("building provider {provider:?} with model {:?}", cfg.model);

    match provider.as_str() {
        "copilot" => Ok(Box::new(CopilotClient::from_config(cfg, creds))),
        "ollama" => Ok(Box::new(OllamaClient::from_config(cfg))),
        _ => Ok(Box::new(OpenAiClient::from_config(cfg, creds)?)),
    }
}
