//! Topology store adapter.
//!
//! The engine never owns its documents. It reads and writes them through a
//! [`TopologyStore`]: a keyed guest collection plus one seating-plan document.
//!
//! # Contract
//!
//! - Writes to a single document are atomic.
//! - [`TopologyStore::batch_update_guests`] is atomic as a unit: either every
//!   patch applies or none does.
//! - There are no cross-document transactions, and no compare-and-swap on the
//!   seating plan. Two writers of the plan race; the last write wins.
//! - Timeouts and retries belong to the adapter, not the engine.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::{FaultConfig, MemoryStore, StoreStats};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::{Guest, GuestId, GuestPatch, SeatingPlan};

// =============================================================================
// Topology Store
// =============================================================================

#[async_trait]
pub trait TopologyStore: Send + Sync + 'static {
    /// Load one guest document. `None` if it does not exist.
    async fn get_guest(&self, id: &GuestId) -> Result<Option<Guest>, StoreError>;

    /// Load every guest document.
    async fn list_guests(&self) -> Result<Vec<Guest>, StoreError>;

    /// Write the engine-owned fields of an existing guest.
    ///
    /// Returns [`StoreError::NotFound`] if the guest does not exist.
    async fn update_guest(&self, id: &GuestId, patch: GuestPatch) -> Result<(), StoreError>;

    /// Load the seating plan. `None` if it was never written.
    async fn get_seating_plan(&self) -> Result<Option<SeatingPlan>, StoreError>;

    /// Write the seating plan.
    ///
    /// With `merge = true`, fields the incoming document leaves empty keep
    /// their stored value (see [`SeatingPlan::merge_from`]). With
    /// `merge = false` the stored document is replaced.
    async fn set_seating_plan(&self, plan: SeatingPlan, merge: bool) -> Result<(), StoreError>;

    /// Apply several guest patches atomically.
    async fn batch_update_guests(&self, updates: Vec<(GuestId, GuestPatch)>)
        -> Result<(), StoreError>;
}
