//! # Matrix and Digest Subcommands
//!
//! `entl matrix` prints the effective matrix of one plan as a table or as
//! JSON. `entl digest` prints every plan's matrix digest and checks that an
//! export/import round trip reproduces it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use entl_core::{BranchId, PermissionFlags, PlanId};
use entl_matrix::{effective_matrix, EffectiveMatrix, ModuleState};
use entl_store::EntitlementStore;

use crate::load_store;

/// Arguments for the `entl matrix` subcommand.
#[derive(Args, Debug)]
pub struct MatrixArgs {
    /// Snapshot file.
    pub path: PathBuf,

    /// Plan identifier (e.g. "PLN-003").
    #[arg(long)]
    pub plan: String,

    /// Resolve branch-role modules for this branch.
    #[arg(long)]
    pub branch: Option<String>,

    /// Print the matrix as JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `entl digest` subcommand.
#[derive(Args, Debug)]
pub struct DigestArgs {
    /// Snapshot file.
    pub path: PathBuf,
}

/// Execute the matrix subcommand.
pub fn run_matrix(args: &MatrixArgs) -> Result<u8> {
    let store = load_store(&args.path)?;
    let plan_id = PlanId::new(args.plan.as_str())?;
    let branch = args
        .branch
        .as_deref()
        .map(BranchId::new)
        .transpose()?;

    let matrix = effective_matrix(&store.snapshot(), &plan_id, branch.as_ref())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&matrix)?);
    } else {
        print!("{}", render_table(&matrix));
    }
    Ok(0)
}

/// Execute the digest subcommand.
pub fn run_digest(args: &DigestArgs) -> Result<u8> {
    let store = load_store(&args.path)?;
    let reloaded = EntitlementStore::import(store.export())
        .context("exported snapshot failed to re-import")?;
    let before = store.snapshot();
    let after = reloaded.snapshot();

    let mut mismatches = 0usize;
    for record in before.plans() {
        let id = &record.plan.id;
        let digest = effective_matrix(&before, id, None)?.digest;
        let again = effective_matrix(&after, id, None)?.digest;
        if digest == again {
            println!("{id}  {digest}");
        } else {
            mismatches += 1;
            println!("{id}  {digest}  MISMATCH after reload: {again}");
        }
    }

    if mismatches > 0 {
        tracing::error!(plans = mismatches, "matrix digests changed across a round trip");
        return Ok(1);
    }
    Ok(0)
}

fn state_label(state: ModuleState) -> &'static str {
    match state {
        ModuleState::Excluded => "excluded",
        ModuleState::Unconfigured => "unconfigured",
        ModuleState::BranchInactive => "branch inactive",
        ModuleState::Resolved => "resolved",
    }
}

/// `V C E D A` columns; `-` for a denied action.
fn flag_cells(flags: &PermissionFlags) -> String {
    [
        (flags.view, 'V'),
        (flags.create, 'C'),
        (flags.edit, 'E'),
        (flags.delete, 'D'),
        (flags.approve, 'A'),
    ]
    .iter()
    .map(|&(on, letter)| if on { letter } else { '-' })
    .collect()
}

/// Plain-text rendering of a matrix.
pub fn render_table(matrix: &EffectiveMatrix) -> String {
    let mut out = format!("{} {}", matrix.plan_id, matrix.plan_name);
    if let Some(branch) = &matrix.branch_id {
        out.push_str(&format!(" (branch {branch})"));
    }
    out.push('\n');
    out.push_str(&format!("digest {}\n", matrix.digest));

    for module in &matrix.modules {
        let role = module
            .role
            .as_ref()
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "\n{} [{}] {} role={}\n",
            module.module_id,
            module.grant_type,
            state_label(module.state),
            role
        ));
        for scope in &module.scopes {
            let role = scope
                .role
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string());
            out.push_str(&format!(
                "  branch {:<6} {:<24} role={}{}{}\n",
                scope.branch_id.to_string(),
                scope.branch_name,
                role,
                if scope.enabled { "" } else { " disabled" },
                if scope.is_default { " default" } else { "" },
            ));
        }
        for feature in &module.features {
            out.push_str(&format!(
                "  {}  {}\n",
                flag_cells(&feature.flags),
                feature.feature_id
            ));
        }
    }
    out
}
