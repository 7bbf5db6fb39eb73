//! imgshift CLI - apply a transformation request to a local image.
//!
//! # Usage
//!
//! ```bash
//! # Resize and convert, storing under ./storage/images/
//! imgshift transform photo.jpg \
//!     --request '{"transformations":{"resize":{"width":500,"height":500},"format":"png"}}'
//!
//! # Read the request from a file
//! imgshift transform photo.jpg --request @request.json --root ./out
//!
//! # Show the effective configuration
//! imgshift config show --config imgshift.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod cli;

/// imgshift - resize, crop, rotate, filter and watermark images.
#[derive(Parser, Debug)]
#[command(name = "imgshift")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "IMGSHIFT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Transform an image and store the result
    Transform(cli::transform::TransformArgs),

    /// View and initialize configuration
    Config(cli::config::ConfigArgs),
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Logging isn't up yet, so config problems go straight to stderr
    let config = match imgshift::Config::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    imgshift::logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("imgshift v{}", imgshift::VERSION);

    match cli.command {
        Commands::Transform(args) => cli::transform::execute(args, config),
        Commands::Config(args) => cli::config::execute(args, config),
    }
}
