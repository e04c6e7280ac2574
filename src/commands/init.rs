//! # Init Command Implementation
//!
//! This module implements the `init` subcommand, which initializes a new
//! workspace in the current directory: the hidden control directory, the
//! universe directory for materialized trees, and the configuration store.
//!
//! It is an error to initialize a workspace inside an existing one.

use std::env;

use anyhow::Result;
use clap::Args;

use unirepo::workspace::Workspace;

/// Initialize a new workspace in the current directory
#[derive(Args, Debug)]
pub struct InitArgs {}

/// Execute the `init` command.
pub fn execute(_args: InitArgs) -> Result<()> {
    let ws = Workspace::init(&env::current_dir()?)?;
    println!("Initialized new workspace at {}", ws.root().display());
    Ok(())
}
