use std::time::Duration;

use anyhow::{Result, bail};
use clap::Parser;
use indicatif::ProgressBar;

use commitcraft::cli_args::{Cli, Command};
use commitcraft::config::Config;
use commitcraft::llm::resolver::{self, EnvCredentials};
use commitcraft::llm::retry::CancelToken;
use commitcraft::llm::{self, copilot, ollama};
use commitcraft::{git, logging, setup};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logger(cli.verbose);

    let cfg = Config::from_sources(&cli);
    cfg.ai.validate()?;

    match &cli.command {
        Some(Command::CheckConfig) => run_check_config(&cfg),
        None => run_generate(&cli, &cfg),
    }
}

/// One-shot mode: diff in, commit message out.
fn run_generate(cli: &Cli, cfg: &Config) -> Result<()> {
    let staged_only = cfg.ai.staged_only && !cli.all;
    let diff = if staged_only {
        git::staged_diff()?
    } else {
        git::worktree_diff()?
    };

    if diff.trim().is_empty() {
        if staged_only {
            println!("No files staged.");
        } else {
            println!("No changes found.");
        }
        return Ok(());
    }

    if diff.len() > cfg.ai.max_diff_bytes {
        bail!(
            "diff too large for AI processing ({} bytes, limit is {})",
            diff.len(),
            cfg.ai.max_diff_bytes
        );
    }

    let branch = git::current_branch().unwrap_or_else(|_| "HEAD".to_string());
    log::info!("generating commit message for branch {branch}");

    let provider = setup::build_provider(&cfg.ai, &EnvCredentials)?;
    let cancel = CancelToken::new();

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Asking {} for a commit message...", provider.name()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let result = llm::generate_commit_message(
        provider.as_ref(),
        &cancel,
        &cfg.ai.style,
        cfg.ai.wrap_width,
        &diff,
    );
    spinner.finish_and_clear();

    let message = result?;

    println!();
    println!("----- Commit Message Preview -----");
    println!("{}", message.render());
    println!("----------------------------------");

    if cli.apply {
        git::write_commit_editmsg(&message.render())?;
        println!("Wrote message to .git/COMMIT_EDITMSG; run `git commit` to use it.");
    }

    Ok(())
}

/// Print the resolved setup and run the active provider's own checks.
fn run_check_config(cfg: &Config) -> Result<()> {
    let ai = &cfg.ai;
    let provider_name = ai.provider.trim().to_ascii_lowercase();

    let endpoint = match provider_name.as_str() {
        "copilot" => ai
            .base_url
            .clone()
            .unwrap_or_else(|| copilot::COPILOT_BASE_URL.to_string()),
        "ollama" => ai
            .base_url
            .clone()
            .unwrap_or_else(|| ollama::OLLAMA_BASE_URL.to_string()),
        _ => ai
            .base_url
            .clone()
            .unwrap_or_else(|| resolver::default_base_url(&ai.provider)),
    };

    println!("provider:  {}", ai.provider);
    println!("model:     {}", ai.model);
    println!("style:     {}", ai.style);
    println!("endpoint:  {endpoint}");
    println!(
        "diff:      {} (limit {} bytes)",
        if ai.staged_only { "staged only" } else { "full worktree" },
        ai.max_diff_bytes
    );

    let provider = setup::build_provider(ai, &EnvCredentials)?;
    provider.validate_config()?;
    println!("configuration OK");

    Ok(())
}
