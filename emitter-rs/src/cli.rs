//! Root CLI structure for emitter-rs

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::commands::inspect::InspectArgs;
use crate::commands::simulate::SimulateArgs;

#[derive(Parser)]
#[command(name = "emitter-rs")]
#[command(about = "Headless particle emitter simulations", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario and report emitter statistics
    Simulate(SimulateArgs),

    /// Show the particle properties a scenario resolves to
    Inspect(InspectArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}
