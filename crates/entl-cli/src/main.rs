//! # entl CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use entl_cli::expire::{run_expire, ExpireArgs};
use entl_cli::matrix::{run_digest, run_matrix, DigestArgs, MatrixArgs};
use entl_cli::seed::{run_seed, SeedArgs};
use entl_cli::validate::{run_validate, ValidateArgs};

/// Entitlement snapshot tooling.
///
/// Generates the demo fixture, validates snapshot files, prints effective
/// permission matrices and runs the expiry sweep offline.
#[derive(Parser, Debug)]
#[command(name = "entl", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the demo fixture to a snapshot file.
    Seed(SeedArgs),

    /// Load a snapshot and check every store invariant.
    Validate(ValidateArgs),

    /// Print the effective permission matrix of one plan.
    Matrix(MatrixArgs),

    /// Print the matrix digest of every plan and check it survives a reload.
    Digest(DigestArgs),

    /// Expire subscriptions whose term has ended.
    Expire(ExpireArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Seed(args) => run_seed(&args),
        Commands::Validate(args) => run_validate(&args),
        Commands::Matrix(args) => run_matrix(&args),
        Commands::Digest(args) => run_digest(&args),
        Commands::Expire(args) => run_expire(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
