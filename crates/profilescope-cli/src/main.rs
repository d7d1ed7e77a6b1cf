// Copyright 2026 Profilescope Contributors
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use profilescope_cli::commands;
use profilescope_cli::output;

#[derive(Parser)]
#[command(
    name = "profilescope",
    about = "Profilescope: resolve company profiles and acquire their content",
    version,
    after_help = "Run 'profilescope <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to $PROFILESCOPE_CONFIG, then ~/.profilescope/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a company and acquire its profile content
    Acquire {
        /// Company name (e.g. "Acme Inc")
        name: String,
        /// Known profile slug or URL; skips resolution
        #[arg(long)]
        slug: Option<String>,
        /// Print the prepared summarization input instead of the result
        #[arg(long)]
        prepared: bool,
    },
    /// Resolve a company to a profile slug and show ranked candidates
    Resolve {
        /// Company name
        name: String,
    },
    /// Acquire every company listed in a file (one per line)
    Batch {
        /// Input file; blank lines and lines starting with '#' are skipped
        file: PathBuf,
        /// Maximum acquisitions in flight
        #[arg(long, default_value = "2")]
        concurrency: usize,
    },
    /// Inspect or reset rate-limit state
    Ratelimit {
        #[command(subcommand)]
        action: RateLimitAction,
    },
    /// Check environment and diagnose issues
    Doctor {
        /// Remove stale temporary browser profiles
        #[arg(long)]
        fix: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum RateLimitAction {
    /// Show the persisted rate-limit window
    Status,
    /// Forget all recorded acquisitions
    Reset,
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("warn,profilescope={level},profilescope_cli={level}"))
    });
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    output::set_json(cli.json);
    init_tracing(&cli.log_level, cli.log_json);

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Acquire {
            name,
            slug,
            prepared,
        } => commands::acquire::run(config, &name, slug.as_deref(), prepared).await,
        Commands::Resolve { name } => commands::resolve::run(config, &name).await,
        Commands::Batch { file, concurrency } => {
            commands::batch::run(config, &file, concurrency).await
        }
        Commands::Ratelimit { action } => match action {
            RateLimitAction::Status => commands::ratelimit::status(config).await,
            RateLimitAction::Reset => commands::ratelimit::reset(config).await,
        },
        Commands::Doctor { fix } => commands::doctor::run(config, fix).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "profilescope", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
