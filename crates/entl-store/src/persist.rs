//! # Snapshot Files
//!
//! Reading and writing [`StoreSnapshot`] files. JSON is the native format;
//! files ending in `.yaml` or `.yml` are read and written as YAML so
//! fixtures can be written by hand.
//!
//! Writes are atomic: the snapshot goes to a temporary file in the target
//! directory which is then renamed over the destination. A crash mid-write
//! leaves the previous file intact.

use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;

use entl_core::EntlError;

use crate::snapshot::StoreSnapshot;

/// Errors reading or writing snapshot files.
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed YAML snapshot {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The file parsed but violates a store invariant.
    #[error("invalid snapshot {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: EntlError,
    },
}

/// On-disk encoding of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Json,
    Yaml,
}

impl SnapshotFormat {
    /// Pick the format from the file extension; JSON unless `.yaml`/`.yml`.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// Parse a snapshot file without validating store invariants.
pub fn read_snapshot(path: &Path) -> Result<StoreSnapshot, PersistError> {
    let bytes = std::fs::read(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match SnapshotFormat::for_path(path) {
        SnapshotFormat::Json => {
            serde_json::from_slice(&bytes).map_err(|source| PersistError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
        SnapshotFormat::Yaml => {
            serde_yaml::from_slice(&bytes).map_err(|source| PersistError::Yaml {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

/// Encode a snapshot in `format`.
pub fn encode_snapshot(
    snapshot: &StoreSnapshot,
    format: SnapshotFormat,
    path: &Path,
) -> Result<Vec<u8>, PersistError> {
    match format {
        SnapshotFormat::Json => {
            serde_json::to_vec_pretty(snapshot).map_err(|source| PersistError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
        SnapshotFormat::Yaml => serde_yaml::to_string(snapshot)
            .map(String::into_bytes)
            .map_err(|source| PersistError::Yaml {
                path: path.to_path_buf(),
                source,
            }),
    }
}

/// Atomically write `snapshot` to `path` in `format`.
pub fn write_snapshot(
    path: &Path,
    snapshot: &StoreSnapshot,
    format: SnapshotFormat,
) -> Result<(), PersistError> {
    let bytes = encode_snapshot(snapshot, format, path)?;
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(&bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}
