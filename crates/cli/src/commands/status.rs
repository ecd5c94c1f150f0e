// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use bs_core::{NetworkDecision, NetworkQuality};
use bs_sync::SyncStatus;
use serde::Serialize;

use super::block_on;
use crate::cli::OutputFormat;
use crate::display::format_status;
use crate::engine::Engine;
use crate::error::Result;

/// JSON output structure for the status command.
#[derive(Serialize)]
struct StatusJson<'a> {
    #[serde(flatten)]
    status: SyncStatus,
    decision: NetworkDecision,
    quality: NetworkQuality,
    probe_url: &'a str,
}

pub fn run(engine: &Engine, output: OutputFormat) -> Result<()> {
    block_on(engine.monitor().check_now())?;

    let status = engine.projector().status();
    let decision = engine.monitor().decision();
    let quality = engine.monitor().quality();
    match output {
        OutputFormat::Text => {
            for line in format_status(&status, &decision, quality) {
                println!("{}", line);
            }
        }
        OutputFormat::Json => {
            let probe_url = engine.config.probe_url();
            let json = StatusJson { status, decision, quality, probe_url: &probe_url };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}
