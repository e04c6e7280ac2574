//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Unirepo - manage a workspace of many independently-versioned trees
#[derive(Parser, Debug)]
#[command(name = "unirepo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        env = "UNIREPO_LOG",
        default_value = "warn"
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Initialize a new workspace in the current directory
    Init(commands::init::InitArgs),

    /// Show information about the current workspace
    Info(commands::info::InfoArgs),

    /// Print the top directory of the current workspace
    Top(commands::top::TopArgs),

    /// Check out a tree and, recursively, its dependencies
    Checkout(commands::checkout::CheckoutArgs),

    /// Set the dependency cone of the current tree to its declared versions
    Focus(commands::focus::FocusArgs),

    /// Resolve and optionally set a version map
    #[command(name = "version-map")]
    VersionMap(commands::version_map::VersionMapArgs),

    /// Repair dependency links of the current tree
    Fix(commands::fix::FixArgs),

    /// Display the checked-out state of every registered tree
    Status(commands::status::StatusArgs),

    /// Display the dependency tree of the current tree
    Tree(commands::tree::TreeArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        match self.command {
            Commands::Init(args) => commands::init::execute(args),
            Commands::Info(args) => commands::info::execute(args),
            Commands::Top(args) => commands::top::execute(args),
            Commands::Checkout(args) => commands::checkout::execute(args),
            Commands::Focus(args) => commands::focus::execute(args),
            Commands::VersionMap(args) => commands::version_map::execute(args),
            Commands::Fix(args) => commands::fix::execute(args),
            Commands::Status(args) => commands::status::execute(args),
            Commands::Tree(args) => commands::tree::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Initializes logging. `RUST_LOG` still wins over the flag when set.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
