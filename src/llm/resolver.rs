//! Provider defaults and credential lookup.
//!
//! The resolver is a pure table: a provider name maps to a default endpoint
//! and a default API-key env var. Unknown non-empty names are taken as a
//! literal base URL, not an error.

use std::collections::HashMap;
use std::env;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";

pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Default base URL for a provider name (case-insensitive).
pub fn default_base_url(provider: &str) -> String {
    let name = provider.trim();
    match name.to_ascii_lowercase().as_str() {
        "" | "openai" => OPENAI_BASE_URL.to_string(),
        "openrouter" => OPENROUTER_BASE_URL.to_string(),
        _ => name.to_string(),
    }
}

/// Default API-key env var for a provider name (case-insensitive).
pub fn default_api_key_env(provider: &str) -> &'static str {
    match provider.trim().to_ascii_lowercase().as_str() {
        "openrouter" => OPENROUTER_KEY_ENV,
        _ => OPENAI_KEY_ENV,
    }
}

/// Where API keys come from. Clients resolve credentials through this
/// instead of touching the process environment directly.
pub trait CredentialSource {
    /// Look up a credential by env-var name. Empty values count as absent.
    fn get(&self, name: &str) -> Option<String>;
}

/// The real process environment.
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn get(&self, name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.is_empty())
    }
}

/// A fixed credential set, mainly for tests and embedding.
impl CredentialSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned().filter(|v| !v.is_empty())
    }
}
