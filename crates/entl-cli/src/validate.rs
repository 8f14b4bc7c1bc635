//! # Validate Subcommand
//!
//! Loads a snapshot through the same import path the API uses, so a file
//! that validates here will also load at server start.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::load_store;

/// Arguments for the `entl validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Snapshot file to check.
    pub path: PathBuf,

    /// Exit with status 2 when a plan still has single-role modules
    /// without a role.
    #[arg(long)]
    pub strict: bool,
}

/// Execute the validate subcommand.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let store = load_store(&args.path)?;
    let view = store.snapshot();
    let catalog = view.catalog();

    println!("{}: OK", args.path.display());
    println!(
        "  catalog: {} modules, {} features, {} branches",
        catalog.modules.len(),
        catalog.features.len(),
        catalog.branches.len()
    );
    println!("  plans: {}", view.plans().count());
    println!("  subscriptions: {}", view.subscriptions().count());

    let mut incomplete = 0usize;
    for record in view.plans() {
        let detail = entl_query::get_plan(&view, &record.plan.id)?;
        if detail.unconfigured_modules.is_empty() {
            continue;
        }
        incomplete += 1;
        let names: Vec<&str> = detail
            .unconfigured_modules
            .iter()
            .map(|m| m.as_str())
            .collect();
        println!(
            "  warning: plan {} has no role for {}",
            record.plan.id,
            names.join(", ")
        );
    }

    if args.strict && incomplete > 0 {
        tracing::warn!(plans = incomplete, "plans with unconfigured modules");
        return Ok(2);
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use entl_store::{demo_snapshot, write_snapshot, SnapshotFormat};

    fn demo_file(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("demo.json");
        write_snapshot(&path, &demo_snapshot().unwrap(), SnapshotFormat::Json).unwrap();
        path
    }

    #[test]
    fn demo_fixture_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = demo_file(&dir);
        let code = run_validate(&ValidateArgs {
            path,
            strict: false,
        })
        .unwrap();
        assert_eq!(code, 0);
    }

    #[test]
    fn strict_flags_trial_plan_without_finance_role() {
        let dir = tempfile::tempdir().unwrap();
        let path = demo_file(&dir);
        let code = run_validate(&ValidateArgs { path, strict: true }).unwrap();
        assert_eq!(code, 2);
    }

    #[test]
    fn delete_without_view_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = demo_file(&dir);
        let text = std::fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let grant = &mut value["plans"][0]["grants"][0];
        assert!(grant.is_object());
        grant["view"] = serde_json::Value::Bool(false);
        grant["delete"] = serde_json::Value::Bool(true);
        std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        assert!(run_validate(&ValidateArgs {
            path,
            strict: false,
        })
        .is_err());
    }
}
