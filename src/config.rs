use crate::cli_args::Cli;
use anyhow::{Result, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Final resolved configuration for commitcraft.
#[derive(Debug, Clone)]
pub struct Config {
    pub ai: AiConfig,
}

/// Everything the generation pipeline consumes.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Provider name (openai, openrouter, ollama, copilot) or a literal base URL.
    pub provider: String,
    pub model: String,
    pub temperature: f32,
    /// 0 means "let the backend decide"; omitted from the wire format.
    pub max_tokens: u32,
    /// Explicit endpoint override; takes precedence over the provider default.
    pub base_url: Option<String>,
    /// Explicit API-key env-var override; takes precedence over the provider default.
    pub api_key_env: Option<String>,
    pub staged_only: bool,
    pub style: String,
    pub wrap_width: usize,
    pub max_diff_bytes: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        AiConfig {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
            base_url: None,
            api_key_env: None,
            staged_only: true,
            style: "conventional".to_string(),
            wrap_width: 72,
            max_diff_bytes: 256 * 1024,
        }
    }
}

impl AiConfig {
    /// Validate before any network activity. Messages are user-facing.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            bail!("ai.model is required");
        }
        if !(self.temperature >= 0.0 && self.temperature <= 2.0) {
            bail!("ai.temperature must be between 0 and 2");
        }
        if self.wrap_width == 0 {
            bail!("ai.wrap_width must be greater than 0");
        }
        if self.max_diff_bytes == 0 {
            bail!("ai.max_diff_bytes must be greater than 0");
        }
        Ok(())
    }
}

impl Config {
    /// Build the final config from CLI flags, environment, TOML file, and defaults.
    ///
    /// Precedence:
    ///   1. CLI flags (`--model`, `--provider`, ...)
    ///   2. Env vars `COMMITCRAFT_MODEL` / `COMMITCRAFT_PROVIDER`
    ///   3. TOML `~/.config/commitcraft.toml`, `[ai]` table
    ///   4. Hardcoded defaults
    pub fn from_sources(cli: &Cli) -> Self {
        let file_cfg = load_file_config().unwrap_or_default();
        Self::resolve(cli, file_cfg)
    }

    fn resolve(cli: &Cli, file_cfg: FileConfig) -> Self {
        let f = file_cfg.ai;
        let d = AiConfig::default();

        let provider = cli
            .provider
            .clone()
            .or_else(|| env::var("COMMITCRAFT_PROVIDER").ok())
            .or(f.provider)
            .unwrap_or(d.provider);

        let model = cli
            .model
            .clone()
            .or_else(|| env::var("COMMITCRAFT_MODEL").ok())
            .or(f.model)
            .unwrap_or(d.model);

        let style = cli.style.clone().or(f.style).unwrap_or(d.style);

        let api_key_env = cli
            .api_key_env
            .clone()
            .or(f.api_key_env)
            .filter(|v| !v.trim().is_empty());

        let base_url = f.base_url.filter(|v| !v.trim().is_empty());

        Config {
            ai: AiConfig {
                provider,
                model,
                temperature: f.temperature.unwrap_or(d.temperature),
                max_tokens: f.max_tokens.unwrap_or(d.max_tokens),
                base_url,
                api_key_env,
                staged_only: f.staged_only.unwrap_or(d.staged_only),
                style,
                wrap_width: f.wrap_width.unwrap_or(d.wrap_width),
                max_diff_bytes: f.max_diff_bytes.unwrap_or(d.max_diff_bytes),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    ai: FileAiConfig,
}

#[derive(Debug, Default, Deserialize)]
struct FileAiConfig {
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    base_url: Option<String>,
    api_key_env: Option<String>,
    staged_only: Option<bool>,
    style: Option<String>,
    wrap_width: Option<usize>,
    max_diff_bytes: Option<usize>,
}

/// Return `~/.config/commitcraft.toml`
fn config_path() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join(".config").join("commitcraft.toml"))
}

fn load_file_config() -> Option<FileConfig> {
    let path = config_path()?;
    if !path.exists() {
        return None;
    }

    let data = fs::read_to_string(&path).ok()?;
    match toml::from_str::<FileConfig>(&data) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("ignoring malformed config at {path:?}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["commitcraft"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = AiConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.provider, "openai");
        assert!(cfg.staged_only);
        assert_eq!(cfg.wrap_width, 72);
    }

    #[test]
    fn missing_model_is_rejected() {
        let cfg = AiConfig {
            model: "  ".to_string(),
            ..AiConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.to_string(), "ai.model is required");
    }

    #[test]
    fn temperature_out_of_range_is_rejected() {
        for t in [-0.1_f32, 2.5, f32::NAN] {
            let cfg = AiConfig {
                temperature: t,
                ..AiConfig::default()
            };
            let err = cfg.validate().unwrap_err();
            assert_eq!(err.to_string(), "ai.temperature must be between 0 and 2");
        }
    }

    #[test]
    fn temperature_bounds_are_inclusive() {
        for t in [0.0_f32, 2.0] {
            let cfg = AiConfig {
                temperature: t,
                ..AiConfig::default()
            };
            assert!(cfg.validate().is_ok());
        }
    }

    #[test]
    fn cli_flags_beat_file_values() {
        let file: FileConfig = toml::from_str(
            r#"
            [ai]
            provider = "openrouter"
            model = "from-file"
            temperature = 0.9
            "#,
        )
        .unwrap();

        let cfg = Config::resolve(&cli(&["--model", "from-cli"]), file);
        assert_eq!(cfg.ai.model, "from-cli");
        assert_eq!(cfg.ai.provider, "openrouter");
        assert_eq!(cfg.ai.temperature, 0.9);
    }

    #[test]
    fn empty_file_overrides_are_ignored() {
        let file: FileConfig = toml::from_str(
            r#"
            [ai]
            base_url = ""
            api_key_env = ""
            "#,
        )
        .unwrap();

        let cfg = Config::resolve(&cli(&[]), file);
        assert_eq!(cfg.ai.base_url, None);
        assert_eq!(cfg.ai.api_key_env, None);
    }
}
