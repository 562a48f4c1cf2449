//! # Seating Sync
//!
//! Keeps a wedding's guest list and its seating plan in agreement.
//!
//! Two documents describe where a guest sits: the guest's own record (with a
//! denormalized `seatAssignment`) and the single seating-plan document (tables
//! with ordered seats). Either can be edited independently, by any client,
//! without a lock. The engine converges them.
//!
//! ## Architecture
//!
//! ```text
//!  guest edit                          plan edit / layout op
//!      │                                      │
//!      ▼ sync_guest_to_seating                ▼ sync_seating_to_guest
//!  TopologyStore (plan)                 TopologyStore (guest)
//!      │                                      │
//!      └──────────► EventBus ◄────────────────┘
//!                      │ subscribe()
//!                      ▼
//!               listener (start)
//!                      │ source != auto-sync
//!                      ▼
//!           Debouncer ─ 500 ms quiet ─► sync_all()
//!                                         │ one atomic batch
//!                                         ▼
//!                                  guest corrections
//!                                  + auto-sync events (ignored)
//! ```
//!
//! ## Key Invariants
//!
//! 1. **Seating wins** - on disagreement the plan's view is copied to the guest
//! 2. **One seat per guest** - later duplicates are vacated by `sync_all`
//! 3. **Fixed capacity** - a table's seat count never changes through assignment
//! 4. **Single flight** - at most one reconciliation pass runs at a time
//! 5. **No retries** - every store failure reaches the caller
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use seating_sync::{JsonFileStore, SeatingSync, SyncConfig, TableId, GuestId};
//!
//! let store = Arc::new(JsonFileStore::new("seating.json"));
//! let engine = SeatingSync::builder(store)
//!     .with_config(SyncConfig::from_env()?)
//!     .build();
//! let listener = engine.start();
//!
//! engine.apply_template("classic", 120).await?;
//! engine
//!     .sync_guest_to_seating(&GuestId::from("g1"), Some(&TableId::from("3")))
//!     .await?;
//! ```

mod assign;
mod bus;
mod config;
mod error;
mod history;
mod model;
mod scheduler;
mod sync;
mod topology;

pub mod layout;
pub mod store;

pub use assign::{auto_assign, suggest_tables, AssignCandidate, AssignmentOutcome, TableSuggestion};
pub use bus::{EventBus, SeatingEvent};
pub use config::SyncConfig;
pub use error::{ErrorCategory, Result, SeatingError, StoreError};
pub use history::{History, LayoutSnapshot, DEFAULT_HISTORY_LIMIT};
pub use layout::{BanquetLayoutParams, CeremonyTemplate, SeatGridParams, SeatingTemplate};
pub use model::{
    CeremonySeat, Guest, GuestId, GuestPatch, HallConfig, SeatAssignment, SeatingPlan, SyncSource,
    TableId,
};
pub use scheduler::{Debouncer, ManualScheduler, Scheduler, Task, TokioScheduler};
pub use store::{JsonFileStore, MemoryStore, TopologyStore};
pub use sync::{Conflict, SeatingSync, SeatingSyncBuilder, SyncHandle, SyncReport, SyncState};
pub use topology::{Seat, SeatRef, Table, TableDraft, TableHandle, TableShape, Topology};
