use clap::{ArgAction, Parser, Subcommand};

/// CLI options
#[derive(Parser, Debug)]
#[command(
    name = "commitcraft",
    version,
    about = "AI-assisted Git commit message generator"
)]
pub struct Cli {
    /// Model name to use (e.g. gpt-4o-mini)
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Provider name (openai, openrouter, ollama, copilot) or a literal base URL
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Name of the environment variable holding the API key
    #[arg(long = "api-key-env", global = true)]
    pub api_key_env: Option<String>,

    /// Commit style: 'conventional' (or 'conv') for Conventional Commits, anything else for plain
    #[arg(long, global = true)]
    pub style: Option<String>,

    /// Use the full working-tree diff instead of only staged changes
    #[arg(long, global = true)]
    pub all: bool,

    /// If set, write the generated message into .git/COMMIT_EDITMSG (no commit is created)
    #[arg(long, global = true)]
    pub apply: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Subcommand (e.g. 'check-config')
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands, e.g. `commitcraft check-config`
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the configuration and show the resolved provider setup
    CheckConfig,
}
