//! # Expire Subcommand
//!
//! Runs the subscription expiry sweep against a snapshot. Without
//! `--write` the sweep is a dry run and the file is left untouched.

use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;

use entl_binder::SubscriptionBinder;
use entl_store::{write_snapshot, SnapshotFormat};

use crate::load_store;

/// Arguments for the `entl expire` subcommand.
#[derive(Args, Debug)]
pub struct ExpireArgs {
    /// Snapshot file.
    pub path: PathBuf,

    /// Expire every Active or Trial subscription whose term ends on or
    /// before this date (YYYY-MM-DD).
    #[arg(long)]
    pub as_of: NaiveDate,

    /// Write the swept store back to the snapshot file.
    #[arg(long)]
    pub write: bool,
}

/// Execute the expire subcommand.
pub fn run_expire(args: &ExpireArgs) -> Result<u8> {
    let store = load_store(&args.path)?;
    let expired = SubscriptionBinder::new(&store).expire_due(args.as_of)?;

    if expired.is_empty() {
        println!("no subscriptions due as of {}", args.as_of);
    }
    for id in &expired {
        println!("expired {id}");
    }

    if args.write && !expired.is_empty() {
        write_snapshot(
            &args.path,
            &store.export(),
            SnapshotFormat::for_path(&args.path),
        )?;
        tracing::info!(path = %args.path.display(), count = expired.len(), "snapshot updated");
    } else if !expired.is_empty() {
        println!("dry run; pass --write to save");
    }
    Ok(0)
}
