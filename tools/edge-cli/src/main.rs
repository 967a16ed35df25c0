//! Edge CLI - Evaluate cache-control decisions offline.
//!
//! Commands:
//! - `edge decide` - Run a request fixture through the decision engine
//! - `edge config` - Show, validate or initialize the cache configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{ConfigArgs, DecideArgs};

/// Edge CLI - Inspect X-LiteSpeed-Cache-Control decisions
#[derive(Parser)]
#[command(name = "edge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide the cache-control header for a request fixture
    Decide(DecideArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("edge_cache=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let output = output::Output::new(cli.verbose, cli.json);

    // `config init` must work before any config exists.
    let result = match cli.command {
        Commands::Config(args) if args.is_init() => {
            commands::config::init(args, cli.config.as_deref(), &output)
        }
        command => context::Context::load(cli.config.as_deref(), output.clone()).and_then(|ctx| {
            match command {
                Commands::Decide(args) => commands::decide::run(args, &ctx),
                Commands::Config(args) => commands::config::run(args, &ctx),
            }
        }),
    };

    if let Err(e) = result {
        output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
