//! # Application State
//!
//! Shared state passed to every Axum handler: the entitlement store and
//! the runtime configuration.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use entl_core::EntlError;
use entl_store::{demo_snapshot, EntitlementStore, PersistError};

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Errors building the configuration or the initial store.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error(transparent)]
    Snapshot(#[from] PersistError),

    #[error("demo fixture rejected: {0}")]
    Seed(#[from] EntlError),
}

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token for `/v1/*`. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    /// Snapshot file loaded at start and rewritten after every mutation.
    pub snapshot_path: Option<PathBuf>,
    /// Load the demo fixture when no snapshot file exists yet.
    pub seed_demo: bool,
    pub metrics_enabled: bool,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("snapshot_path", &self.snapshot_path)
            .field("seed_demo", &self.seed_demo)
            .field("metrics_enabled", &self.metrics_enabled)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
            snapshot_path: None,
            seed_demo: true,
            metrics_enabled: true,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read the `ENTL_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let port = match lookup("ENTL_PORT") {
            Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidVar {
                name: "ENTL_PORT",
                value: v,
            })?,
            None => defaults.port,
        };

        let log_format = match lookup("ENTL_LOG_FORMAT") {
            Some(v) => match v.trim().to_ascii_lowercase().as_str() {
                "json" => LogFormat::Json,
                "text" | "" => LogFormat::Text,
                _ => {
                    return Err(ConfigError::InvalidVar {
                        name: "ENTL_LOG_FORMAT",
                        value: v,
                    })
                }
            },
            None => defaults.log_format,
        };

        Ok(Self {
            port,
            auth_token: lookup("ENTL_AUTH_TOKEN").filter(|t| !t.is_empty()),
            snapshot_path: lookup("ENTL_SNAPSHOT_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            seed_demo: flag(lookup("ENTL_SEED_DEMO"), defaults.seed_demo),
            metrics_enabled: flag(lookup("ENTL_METRICS_ENABLED"), defaults.metrics_enabled),
            log_format,
        })
    }
}

/// Anything other than "false"/"0" counts as enabled.
fn flag(value: Option<String>, default: bool) -> bool {
    match value {
        Some(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0"),
        None => default,
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: Arc<EntitlementStore>,
    pub config: AppConfig,
}

impl AppState {
    /// Empty store, default configuration.
    pub fn new() -> Self {
        Self::with_store(EntitlementStore::new(), AppConfig::default())
    }

    pub fn with_store(store: EntitlementStore, config: AppConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    /// Build the store the configuration asks for: the snapshot file when
    /// it exists, otherwise the demo fixture (or an empty store), written
    /// through to the snapshot path when one is set.
    pub fn from_config(config: AppConfig) -> Result<Self, ConfigError> {
        let existing = config.snapshot_path.as_ref().filter(|p| p.exists());

        let store = match existing {
            Some(path) => {
                let store = EntitlementStore::load(path)?;
                tracing::info!(path = %path.display(), "snapshot loaded");
                store
            }
            None if config.seed_demo => {
                tracing::info!("loading demo fixture");
                EntitlementStore::import(demo_snapshot()?)?
            }
            None => EntitlementStore::new(),
        };

        let store = match &config.snapshot_path {
            Some(path) => {
                let store = store.with_write_through(path.clone());
                if existing.is_none() {
                    store.flush()?;
                }
                store
            }
            None => store,
        };

        Ok(Self::with_store(store, config))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.auth_token.is_none());
        assert!(config.seed_demo);
        assert!(config.metrics_enabled);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn reads_every_variable() {
        let config = config(&[
            ("ENTL_PORT", "9000"),
            ("ENTL_AUTH_TOKEN", "tok"),
            ("ENTL_SNAPSHOT_PATH", "/tmp/entl.json"),
            ("ENTL_SEED_DEMO", "false"),
            ("ENTL_METRICS_ENABLED", "0"),
            ("ENTL_LOG_FORMAT", "JSON"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
        assert_eq!(config.snapshot_path, Some(PathBuf::from("/tmp/entl.json")));
        assert!(!config.seed_demo);
        assert!(!config.metrics_enabled);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = config(&[("ENTL_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { name: "ENTL_PORT", .. }));
    }

    #[test]
    fn empty_token_disables_auth() {
        assert!(config(&[("ENTL_AUTH_TOKEN", "")]).unwrap().auth_token.is_none());
    }

    #[test]
    fn debug_redacts_token() {
        let config = AppConfig {
            auth_token: Some("s3cret".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn seeds_demo_and_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entl.json");
        let state = AppState::from_config(AppConfig {
            snapshot_path: Some(path.clone()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(state.store.snapshot().plans().count(), 4);
        assert!(path.exists());

        // A second start loads the file instead of the fixture.
        let reloaded = AppState::from_config(AppConfig {
            snapshot_path: Some(path),
            seed_demo: false,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(reloaded.store.snapshot().plans().count(), 4);
    }

    #[test]
    fn empty_store_without_seed() {
        let state = AppState::from_config(AppConfig {
            seed_demo: false,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(state.store.snapshot().plans().count(), 0);
    }
}
