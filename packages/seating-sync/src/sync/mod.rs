//! The reconciliation engine.
//!
//! [`SeatingSync`] keeps the guest collection and the seating plan telling the
//! same story. Both write paths publish a [`SeatingEvent`]; the listener task
//! started by [`SeatingSync::start`] debounces those events into a full
//! [`sync_all`](SeatingSync::sync_all) pass, which copies the plan's view onto
//! every guest that disagrees. When the two sides conflict, the seating plan
//! wins.
//!
//! # Example
//!
//! ```ignore
//! let engine = SeatingSync::builder(Arc::new(store))
//!     .with_config(SyncConfig::from_env()?)
//!     .build();
//! let listener = engine.start();
//!
//! engine.sync_guest_to_seating(&guest_id, Some(&table_id)).await?;
//! // ~500 ms later the listener reconciles the guest's own copy.
//!
//! listener.abort();
//! ```

mod direction;
mod layout;
mod reconcile;

pub use reconcile::{Conflict, SyncReport};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::bus::{EventBus, SeatingEvent};
use crate::config::SyncConfig;
use crate::error::{Result, SeatingError};
use crate::history::{History, LayoutSnapshot};
use crate::model::SeatingPlan;
use crate::scheduler::{Debouncer, Scheduler, TokioScheduler};
use crate::store::TopologyStore;

/// Whether a reconciliation pass is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Syncing,
}

struct Inner<S> {
    store: Arc<S>,
    bus: EventBus,
    debouncer: Debouncer,
    config: SyncConfig,
    syncing: AtomicBool,
    history: Mutex<History<LayoutSnapshot>>,
}

/// Seating synchronization and layout engine.
///
/// Cheap to clone; clones share the store, bus, history and busy flag.
pub struct SeatingSync<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for SeatingSync<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: TopologyStore> SeatingSync<S> {
    pub fn builder(store: Arc<S>) -> SeatingSyncBuilder<S> {
        SeatingSyncBuilder::new(store)
    }

    /// Engine with default configuration, a fresh bus and a tokio timer.
    pub fn new(store: Arc<S>) -> Self {
        Self::builder(store).build()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.inner.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SyncState {
        if self.inner.syncing.load(Ordering::Acquire) {
            SyncState::Syncing
        } else {
            SyncState::Idle
        }
    }

    /// Spawn the listener that turns bus events into debounced passes.
    ///
    /// The subscription is taken before this returns, so an event published
    /// right after `start` is not missed.
    pub fn start(&self) -> SyncHandle {
        let mut receiver = self.inner.bus.subscribe();
        let engine = self.clone();
        info!(
            debounce_ms = self.inner.config.debounce_window.as_millis() as u64,
            "starting seating sync listener"
        );

        let handle = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.is_self_inflicted() => {
                        trace!(guest_id = %event.guest_id, "ignoring auto-sync event");
                    }
                    Ok(event) => {
                        debug!(
                            source = %event.source,
                            guest_id = %event.guest_id,
                            "seating change observed"
                        );
                        engine.debounced_sync_all();
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "sync listener lagged, scheduling a full pass");
                        engine.debounced_sync_all();
                    }
                    Err(RecvError::Closed) => {
                        info!("event bus closed, sync listener stopping");
                        break;
                    }
                }
            }
        });

        SyncHandle { handle }
    }

    fn publish(&self, event: SeatingEvent) {
        let receivers = self.inner.bus.publish(event);
        trace!(receivers, "seating event published");
    }

    async fn load_plan(&self) -> Result<Option<SeatingPlan>> {
        self.inner
            .store
            .get_seating_plan()
            .await
            .map_err(SeatingError::StoreRead)
    }

    fn history(&self) -> MutexGuard<'_, History<LayoutSnapshot>> {
        match self.inner.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<S> std::fmt::Debug for SeatingSync<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatingSync")
            .field("bus", &self.inner.bus)
            .field("config", &self.inner.config)
            .field("syncing", &self.inner.syncing.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Sync Handle
// =============================================================================

/// Handle to the running listener task.
pub struct SyncHandle {
    handle: JoinHandle<()>,
}

impl SyncHandle {
    /// Stop the listener. A pass that already started still completes.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl std::fmt::Debug for SyncHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncHandle")
            .field("finished", &self.is_finished())
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`SeatingSync`].
///
/// ```ignore
/// let scheduler = Arc::new(ManualScheduler::new());
/// let engine = SeatingSync::builder(store)
///     .with_bus(shared_bus)
///     .with_scheduler(scheduler.clone())
///     .build();
/// ```
pub struct SeatingSyncBuilder<S> {
    store: Arc<S>,
    bus: Option<EventBus>,
    scheduler: Option<Arc<dyn Scheduler>>,
    config: SyncConfig,
}

impl<S: TopologyStore> SeatingSyncBuilder<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            bus: None,
            scheduler: None,
            config: SyncConfig::default(),
        }
    }

    /// Share an existing bus instead of creating one sized by the config.
    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Drive debouncing with `scheduler` instead of a tokio timer.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> SeatingSync<S> {
        let bus = self
            .bus
            .unwrap_or_else(|| EventBus::with_capacity(self.config.bus_capacity));
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler::new()));

        SeatingSync {
            inner: Arc::new(Inner {
                store: self.store,
                bus,
                debouncer: Debouncer::new(scheduler, self.config.debounce_window),
                history: Mutex::new(History::with_limit(self.config.history_limit)),
                config: self.config,
                syncing: AtomicBool::new(false),
            }),
        }
    }
}
