//! stevedore CLI library

pub mod commands;

use clap::{Parser, Subcommand};

/// stevedore - render container deploy specs into Kubernetes workloads
#[derive(Parser, Debug)]
#[command(name = "stevedore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
#[allow(clippy::large_enum_variant)] // parsed once per process
pub enum Commands {
    /// Render the workload manifest for a deploy spec
    Render(commands::render::RenderArgs),
    /// Print the JSON schema of the deploy spec
    Schema,
}

impl Cli {
    /// Run the CLI command
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Commands::Render(args) => commands::render::run(args),
            Commands::Schema => commands::schema::run(),
        }
    }
}
