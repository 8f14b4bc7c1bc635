//! # entl-store — The Entitlement Store
//!
//! Owns plans, the module/feature/branch catalog, permission grants,
//! module role assignments and the subscription table.
//!
//! - [`EntitlementStore`] — the live store. All writes validate before
//!   they commit and either fully apply or leave the store unchanged.
//! - [`StoreView`] — an immutable point-in-time view, obtained with
//!   [`EntitlementStore::snapshot`]. Resolution and queries run against
//!   views, never against the live store.
//! - [`StoreSnapshot`] — the serializable image used for persistence,
//!   the CLI and the demo fixture.

mod locks;
pub mod persist;
pub mod record;
pub mod seed;
pub mod snapshot;
pub mod state;
pub mod store;

pub use persist::{read_snapshot, write_snapshot, PersistError, SnapshotFormat};
pub use record::PlanRecord;
pub use seed::demo_snapshot;
pub use snapshot::{CatalogSnapshot, PlanSnapshot, StoreSnapshot, SNAPSHOT_VERSION};
pub use state::{Catalog, StoreState, StoreView};
pub use store::{ArchiveMode, ArchiveOutcome, EntitlementStore};
