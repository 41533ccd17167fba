pub mod copilot;
pub mod error;
pub mod format;
pub mod ollama;
pub mod openai;
pub mod prompt_builder;
mod prompts;
pub mod resolver;
pub mod retry;

pub use error::LlmError;
pub use format::CommitMessage;

use prompt_builder::PromptPair;
use retry::CancelToken;

/// Capability set every backend implements.
///
/// `generate` takes the already-built prompt pair and returns the raw
/// completion text; splitting into subject/body happens in the pipeline.
pub trait Provider: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Cheap structural checks; no network.
    fn validate_config(&self) -> Result<(), LlmError>;

    /// One generation, retries included. Honors `cancel` between attempts.
    fn generate(&self, cancel: &CancelToken, prompt: &PromptPair) -> Result<String, LlmError>;
}

/// The whole pipeline: validate, build the prompt, call the backend,
/// shape the completion into a commit message.
pub fn generate_commit_message(
    provider: &dyn Provider,
    cancel: &CancelToken,
    style: &str,
    wrap_width: usize,
    diff: &str,
) -> Result<CommitMessage, LlmError> {
    provider.validate_config()?;

    let prompt = prompt_builder::commit_prompt(style, wrap_width, diff);
    log::debug!(
        "generating with provider {:?} ({} diff bytes)",
        provider.name(),
        diff.len()
    );

    let raw = provider.generate(cancel, &prompt)?;
    format::format_commit_message(&raw)
}

/// Truncate long strings for debug logging, staying on char boundaries.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...\n[truncated {} chars]", &s[..cut], s.len() - cut)
}
