//! CLI command implementations.

pub mod config;
pub mod decide;

use clap::{Args, Subcommand};

/// Arguments for the decide command.
#[derive(Args)]
pub struct DecideArgs {
    /// Request fixture (TOML, or JSON when ending in .json).
    pub request: String,

    /// Print every flag change that led to the decision.
    #[arg(short, long)]
    pub explain: bool,

    /// Ignore an invalid user agent pattern instead of failing.
    #[arg(long)]
    pub lenient: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

impl ConfigArgs {
    /// Whether this is `config init`, which runs without a loaded config.
    pub fn is_init(&self) -> bool {
        matches!(self.command, ConfigCommand::Init { .. })
    }
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Validate the config file, including exclusion patterns.
    Validate,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
}
