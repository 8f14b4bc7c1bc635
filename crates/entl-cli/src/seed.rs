//! # Seed Subcommand
//!
//! Writes the demo fixture (six modules, five branches, four plans and
//! three subscriptions) to a snapshot file.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, ValueEnum};

use entl_store::{demo_snapshot, write_snapshot, SnapshotFormat};

/// Snapshot encoding selectable on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Json,
    Yaml,
}

impl From<FormatArg> for SnapshotFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => SnapshotFormat::Json,
            FormatArg::Yaml => SnapshotFormat::Yaml,
        }
    }
}

/// Arguments for the `entl seed` subcommand.
#[derive(Args, Debug)]
pub struct SeedArgs {
    /// Destination file.
    #[arg(long)]
    pub out: PathBuf,

    /// Encoding. Defaults to the one implied by the file extension.
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}

/// Execute the seed subcommand.
pub fn run_seed(args: &SeedArgs) -> Result<u8> {
    let format = args
        .format
        .map(SnapshotFormat::from)
        .unwrap_or_else(|| SnapshotFormat::for_path(&args.out));
    let snapshot = demo_snapshot()?;
    write_snapshot(&args.out, &snapshot, format)?;

    tracing::info!(path = %args.out.display(), ?format, "demo fixture written");
    println!(
        "wrote {} plans and {} subscriptions to {}",
        snapshot.plans.len(),
        snapshot.subscriptions.len(),
        args.out.display()
    );
    Ok(0)
}
