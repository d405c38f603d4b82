use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    version,
    about = "Anniversaries, photo album and diary kept on your own disk"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the stored collections
    #[clap(long, value_parser)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the keepsake application
    #[clap(subcommand)]
    pub command: Commands,
}
