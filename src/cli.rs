use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Simple, file-backed R&D order tracker.
/// Storage defaults to ~/.otr/orders.json or a path passed via --db.
#[derive(Parser)]
#[command(name = "otr", version, about = "R&D order tracking CLI")]
pub struct Cli {
    /// Path to the JSON database file.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
