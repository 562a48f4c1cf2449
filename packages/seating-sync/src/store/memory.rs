//! In-process store with fault injection.
//!
//! `MemoryStore` keeps both collections behind one mutex, so a batch update is
//! trivially atomic. Faults and an artificial read delay can be switched on to
//! exercise the engine's error and single-flight paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::TopologyStore;
use crate::error::StoreError;
use crate::model::{Guest, GuestId, GuestPatch, SeatingPlan};

/// Failure switches for [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct FaultConfig {
    /// Fail `get_guest`, `list_guests` and `get_seating_plan`.
    pub fail_reads: bool,
    /// Fail `update_guest`.
    pub fail_guest_writes: bool,
    /// Fail `set_seating_plan`.
    pub fail_plan_writes: bool,
    /// Fail `batch_update_guests`.
    pub fail_batches: bool,
    /// Sleep this long inside `list_guests` before answering.
    pub read_delay: Option<Duration>,
}

/// Call counters, for asserting how much I/O an operation performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub guest_lists: usize,
    pub plan_reads: usize,
    pub plan_writes: usize,
    pub guest_writes: usize,
    pub batches: usize,
}

#[derive(Debug, Default)]
struct State {
    guests: BTreeMap<GuestId, Guest>,
    plan: Option<SeatingPlan>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    faults: Mutex<FaultConfig>,
    guest_lists: AtomicUsize,
    plan_reads: AtomicUsize,
    plan_writes: AtomicUsize,
    guest_writes: AtomicUsize,
    batches: AtomicUsize,
}

fn recover<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    match lock.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with guests and an optional plan.
    pub fn with_documents(guests: impl IntoIterator<Item = Guest>, plan: Option<SeatingPlan>) -> Self {
        let store = Self::new();
        {
            let mut state = recover(&store.state);
            state.guests = guests.into_iter().map(|g| (g.id.clone(), g)).collect();
            state.plan = plan;
        }
        store
    }

    /// Insert or overwrite a guest document directly, bypassing the engine.
    pub fn insert_guest(&self, guest: Guest) {
        recover(&self.state).guests.insert(guest.id.clone(), guest);
    }

    /// Replace the plan directly, bypassing the engine.
    pub fn put_plan(&self, plan: Option<SeatingPlan>) {
        recover(&self.state).plan = plan;
    }

    pub fn guest(&self, id: &GuestId) -> Option<Guest> {
        recover(&self.state).guests.get(id).cloned()
    }

    pub fn plan(&self) -> Option<SeatingPlan> {
        recover(&self.state).plan.clone()
    }

    pub fn set_faults(&self, faults: FaultConfig) {
        *recover(&self.faults) = faults;
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            guest_lists: self.guest_lists.load(Ordering::Acquire),
            plan_reads: self.plan_reads.load(Ordering::Acquire),
            plan_writes: self.plan_writes.load(Ordering::Acquire),
            guest_writes: self.guest_writes.load(Ordering::Acquire),
            batches: self.batches.load(Ordering::Acquire),
        }
    }

    fn faults(&self) -> FaultConfig {
        recover(&self.faults).clone()
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Unavailable(format!("injected {} failure", what))
}

#[async_trait]
impl TopologyStore for MemoryStore {
    async fn get_guest(&self, id: &GuestId) -> Result<Option<Guest>, StoreError> {
        if self.faults().fail_reads {
            return Err(injected("read"));
        }
        Ok(self.guest(id))
    }

    async fn list_guests(&self) -> Result<Vec<Guest>, StoreError> {
        self.guest_lists.fetch_add(1, Ordering::AcqRel);
        let faults = self.faults();
        if let Some(delay) = faults.read_delay {
            tokio::time::sleep(delay).await;
        }
        if faults.fail_reads {
            return Err(injected("read"));
        }
        Ok(recover(&self.state).guests.values().cloned().collect())
    }

    async fn update_guest(&self, id: &GuestId, patch: GuestPatch) -> Result<(), StoreError> {
        if self.faults().fail_guest_writes {
            return Err(injected("guest write"));
        }
        let mut state = recover(&self.state);
        let guest = state
            .guests
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("guests/{}", id)))?;
        guest.apply(&patch);
        self.guest_writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn get_seating_plan(&self) -> Result<Option<SeatingPlan>, StoreError> {
        self.plan_reads.fetch_add(1, Ordering::AcqRel);
        if self.faults().fail_reads {
            return Err(injected("read"));
        }
        Ok(self.plan())
    }

    async fn set_seating_plan(&self, plan: SeatingPlan, merge: bool) -> Result<(), StoreError> {
        if self.faults().fail_plan_writes {
            return Err(injected("plan write"));
        }
        let mut state = recover(&self.state);
        match (state.plan.as_mut(), merge) {
            (Some(stored), true) => stored.merge_from(plan),
            _ => state.plan = Some(plan),
        }
        self.plan_writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn batch_update_guests(
        &self,
        updates: Vec<(GuestId, GuestPatch)>,
    ) -> Result<(), StoreError> {
        if self.faults().fail_batches {
            return Err(injected("batch"));
        }
        let mut state = recover(&self.state);
        if let Some((missing, _)) = updates.iter().find(|(id, _)| !state.guests.contains_key(id)) {
            return Err(StoreError::NotFound(format!("guests/{}", missing)));
        }
        for (id, patch) in &updates {
            if let Some(guest) = state.guests.get_mut(id) {
                guest.apply(patch);
            }
        }
        self.batches.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
