//! stevedore CLI
//!
//! Renders container deploy specs into workload manifests.

use clap::Parser;
use stevedore_cli::Cli;
use stevedore_common::telemetry::{init_telemetry, LogFormat, TelemetryConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_telemetry(TelemetryConfig {
        format: if cli.json_logs {
            LogFormat::Json
        } else {
            LogFormat::Text
        },
        ..Default::default()
    })?;

    cli.run()
}
