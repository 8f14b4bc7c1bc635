//! # entl-cli — Offline Tooling for Entitlement Snapshots
//!
//! Provides the `entl` command-line interface. Every subcommand works on a
//! snapshot file (JSON, or YAML for `.yaml`/`.yml` paths) without a
//! running server.
//!
//! ## Subcommands
//!
//! - `entl seed` — Write the demo fixture.
//! - `entl validate` — Load a snapshot and check every store invariant.
//! - `entl matrix` — Print the effective matrix of one plan.
//! - `entl digest` — Print the matrix digest of every plan.
//! - `entl expire` — Run the expiry sweep against a snapshot.
//!
//! ```bash
//! entl seed --out demo.json
//! entl matrix demo.json --plan PLN-003 --branch b5
//! entl expire demo.json --as-of 2024-04-01 --write
//! ```

pub mod expire;
pub mod matrix;
pub mod seed;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};

use entl_store::{read_snapshot, EntitlementStore};

/// Read `path` and build a store from it, validating every invariant.
pub fn load_store(path: &Path) -> Result<EntitlementStore> {
    let snapshot = read_snapshot(path)?;
    let store = EntitlementStore::import(snapshot)
        .with_context(|| format!("snapshot {} is inconsistent", path.display()))?;
    tracing::debug!(path = %path.display(), "snapshot loaded");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entl_store::{demo_snapshot, write_snapshot, SnapshotFormat};

    #[test]
    fn load_store_reads_demo_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.json");
        write_snapshot(&path, &demo_snapshot().unwrap(), SnapshotFormat::Json).unwrap();

        let store = load_store(&path).unwrap();
        assert_eq!(store.snapshot().plans().count(), 4);
    }

    #[test]
    fn load_store_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_store(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn load_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, b"{\"plans\": 3}").unwrap();
        assert!(load_store(&path).is_err());
    }
}
