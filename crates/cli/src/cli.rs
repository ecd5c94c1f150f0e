// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};

/// Output format for commands supporting structured output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

const QUICKSTART_HELP: &str = "\
Get started:
  barsync status                                      Probe the network, show the queue
  barsync enqueue CREATE_TICKET --bar b1 --user u1 \\
      --payload '{\"created_by\":\"u1\",\"closing_hour\":4}'
  barsync sync                                        Push queued operations once
  barsync run                                         Keep syncing until Ctrl-C";

#[derive(Parser, Debug)]
#[command(name = "barsync")]
#[command(about = "Offline-first write queue for the bar point of sale")]
#[command(
    long_about = "Offline-first write queue for the bar point of sale.\n\n\
    Mutations recorded while offline are persisted locally and pushed to the \
    remote authority once connectivity returns."
)]
#[command(after_help = QUICKSTART_HELP)]
pub struct Cli {
    /// Configuration file (default: <config dir>/barsync/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log at debug level (overridden by BARSYNC_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Probe the network once and show the decision and queue counts
    Status {
        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// List queued operations
    List {
        /// Only operations with this status (pending, syncing, success, error).
        #[arg(long, short)]
        status: Option<String>,

        /// Only operations for this bar.
        #[arg(long, short)]
        bar: Option<String>,

        #[arg(long = "output", short = 'o', value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Queue a mutation for the remote authority
    #[command(group(ArgGroup::new("source").required(true).args(["payload", "payload_file"])))]
    Enqueue {
        /// Mutation type (e.g. CREATE_SALE, PAY_TICKET).
        #[arg(value_name = "TYPE")]
        mutation_type: String,

        #[arg(long)]
        bar: String,

        #[arg(long)]
        user: String,

        /// JSON object payload.
        #[arg(long)]
        payload: Option<String>,

        /// File holding the JSON object payload.
        #[arg(long, value_name = "PATH")]
        payload_file: Option<PathBuf>,
    },

    /// Return failed operations to pending
    #[command(group(ArgGroup::new("target").required(true).args(["ids", "all"])))]
    Retry {
        ids: Vec<String>,

        /// Retry every failed operation.
        #[arg(long)]
        all: bool,
    },

    /// Drop one operation from the queue
    Remove { id: String },

    /// Drop every queued operation (or one bar's)
    Clear {
        #[arg(long)]
        bar: Option<String>,

        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Probe the network, then run one sync cycle
    Sync,

    /// Run the monitor and orchestrator until interrupted
    Run,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
