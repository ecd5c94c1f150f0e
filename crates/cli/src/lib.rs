// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! barsync - operator CLI for the offline-first sync engine.
//!
//! This crate embeds [`bs_sync`] against a local durable store and an HTTP
//! remote authority, so queued point-of-sale mutations can be inspected,
//! repaired and pushed from a terminal.
//!
//! # Main Components
//!
//! - [`Config`] - TOML configuration (state directory, store backend,
//!   network timings, retry policy, remote)
//! - [`Engine`] - monitor, queue and orchestrator wired from a [`Config`]
//! - [`Error`] - Error types for all commands

mod cli;
mod commands;
mod display;

pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod logging;

pub use cli::{Cli, Command, OutputFormat};
pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};

/// Loads configuration, opens the engine and runs `cli.command`.
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::resolve(cli.config.as_deref())?;
    let engine = Engine::open(config)?;
    match cli.command {
        Command::Status { output } => commands::status::run(&engine, output),
        Command::List { status, bar, output } => {
            commands::list::run(&engine, status.as_deref(), bar.as_deref(), output)
        }
        Command::Enqueue { mutation_type, bar, user, payload, payload_file } => {
            commands::enqueue::run(
                &engine,
                &mutation_type,
                &bar,
                &user,
                payload.as_deref(),
                payload_file.as_deref(),
            )
        }
        Command::Retry { ids, all } => commands::retry::run(&engine, &ids, all),
        Command::Remove { id } => commands::remove::run(&engine, &id),
        Command::Clear { bar, yes } => commands::clear::run(&engine, bar.as_deref(), yes),
        Command::Sync => commands::sync::run(&engine),
        Command::Run => commands::run::run(&engine),
    }
}
