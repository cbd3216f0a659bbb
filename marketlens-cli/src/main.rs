//! MarketLens CLI - Command-line interface
//!
//! This binary provides a command-line interface to the MarketLens library.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::config::ConfigCommands;
use commands::resolve::ResolveArgs;

#[derive(Parser)]
#[command(name = "marketlens")]
#[command(version = marketlens::VERSION)]
#[command(about = "Resolve healthcare markets around a location", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.marketlens/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the market around a center point from a JSON fixture
    Resolve(ResolveArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .unwrap_or_else(marketlens::config::config_file_path);

    let result = match cli.command {
        Commands::Resolve(args) => commands::resolve::run(args, &config_path),
        Commands::Config { command } => commands::config::run(command, &config_path),
    };

    if let Err(e) = result {
        e.exit();
    }
}
