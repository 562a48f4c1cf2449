//! Full reconciliation pass and conflict report.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::SeatingSync;
use crate::bus::SeatingEvent;
use crate::error::{Result, SeatingError};
use crate::model::{GuestId, GuestPatch, SeatAssignment, SyncSource, TableId};
use crate::store::TopologyStore;

/// Outcome of one [`SeatingSync::sync_all`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    /// Guest documents corrected.
    pub changes_count: usize,
    /// Duplicate seatings vacated in the plan.
    pub repaired_seats: usize,
    /// True when another pass was already running and this call did nothing.
    pub skipped: bool,
}

impl SyncReport {
    fn skipped() -> Self {
        Self {
            success: true,
            skipped: true,
            ..Self::default()
        }
    }

    fn done(changes_count: usize, repaired_seats: usize) -> Self {
        Self {
            success: true,
            changes_count,
            repaired_seats,
            skipped: false,
        }
    }
}

/// A divergence between the guest collection and the seating plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// The guest's own copy disagrees with where the plan seats them.
    GuestMismatch {
        guest_id: GuestId,
        seating: Option<SeatAssignment>,
        guest: Option<SeatAssignment>,
    },
    /// A seat holds a guest id with no guest document.
    OrphanSeat {
        guest_id: GuestId,
        table_id: TableId,
        seat_index: u32,
    },
    /// A guest occupies more than one seat; this is a later one.
    DuplicateSeating {
        guest_id: GuestId,
        table_id: TableId,
        seat_index: u32,
    },
}

/// Releases the busy flag however the pass ends.
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S: TopologyStore> SeatingSync<S> {
    /// Reconcile every guest against the seating plan.
    ///
    /// Reads both sides once, vacates duplicate seatings in the plan, then
    /// commits one atomic batch correcting every guest whose copy differs
    /// from the plan. A call made while a pass is running returns at once
    /// with `skipped = true`.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        if self
            .inner
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("reconciliation already in flight, skipping");
            return Ok(SyncReport::skipped());
        }
        let _guard = SyncingGuard(&self.inner.syncing);
        let pass = Uuid::new_v4();

        let stored = self.load_plan().await?;
        let guests = self
            .inner
            .store
            .list_guests()
            .await
            .map_err(SeatingError::StoreRead)?;

        let Some(mut plan) = stored else {
            info!(pass = %pass, "no seating plan yet, nothing to reconcile");
            return Ok(SyncReport::done(0, 0));
        };

        let mut duplicates = plan.topology.dedupe_guests();
        if !duplicates.is_empty() {
            // Repair the latest plan, not the one read before listing guests,
            // so moves committed in between survive.
            if let Some(fresh) = self.load_plan().await? {
                plan = fresh;
                duplicates = plan.topology.dedupe_guests();
            }
        }
        if !duplicates.is_empty() {
            for (guest_id, seat) in &duplicates {
                warn!(
                    pass = %pass,
                    guest_id = %guest_id,
                    seat = seat.index,
                    "vacating duplicate seating"
                );
            }
            plan.touch(SyncSource::AutoSync);
            self.inner
                .store
                .set_seating_plan(plan.clone(), true)
                .await
                .map_err(SeatingError::StoreWrite)?;
        }

        let seating: HashMap<&GuestId, SeatAssignment> = plan
            .topology
            .occupancy()
            .filter_map(|(seat, guest)| plan.topology.assignment_at(seat).map(|a| (guest, a)))
            .collect();

        let staged: Vec<(GuestId, GuestPatch)> = guests
            .iter()
            .filter_map(|guest| {
                let expected = seating.get(&guest.id);
                guest.diverges_from(expected).then(|| {
                    (
                        guest.id.clone(),
                        GuestPatch::seating(expected.cloned(), SyncSource::Seating),
                    )
                })
            })
            .collect();

        if staged.is_empty() {
            debug!(pass = %pass, guests = guests.len(), "guest copies already in sync");
            return Ok(SyncReport::done(0, duplicates.len()));
        }

        let changes = staged.len();
        let events: Vec<SeatingEvent> = staged
            .iter()
            .map(|(id, patch)| {
                SeatingEvent::new(SyncSource::AutoSync, id.clone(), patch.seat_assignment.clone())
            })
            .collect();

        self.inner
            .store
            .batch_update_guests(staged)
            .await
            .map_err(|source| SeatingError::ReconciliationBatch {
                staged: changes,
                source,
            })?;

        for event in events {
            self.publish(event);
        }

        info!(
            pass = %pass,
            changes,
            repaired = duplicates.len(),
            "reconciliation pass committed"
        );
        Ok(SyncReport::done(changes, duplicates.len()))
    }

    /// Run [`sync_all`](Self::sync_all) once the debounce window passes
    /// without another call.
    ///
    /// Errors of the deferred pass are logged; the next trigger retries.
    pub fn debounced_sync_all(&self) {
        let engine = self.clone();
        self.inner.debouncer.trigger(
            async move {
                match engine.sync_all().await {
                    Ok(report) if report.skipped => {
                        debug!("debounced pass skipped, another pass in flight")
                    }
                    Ok(report) => debug!(changes = report.changes_count, "debounced pass finished"),
                    Err(e) => error!(
                        error = ?e,
                        retryable = e.is_retryable(),
                        "debounced reconciliation failed"
                    ),
                }
            }
            .boxed(),
        );
    }

    /// Report every divergence between the two sides without changing either.
    pub async fn detect_conflicts(&self) -> Result<Vec<Conflict>> {
        let guests = self
            .inner
            .store
            .list_guests()
            .await
            .map_err(SeatingError::StoreRead)?;
        let topology = self
            .inner
            .store
            .get_seating_plan()
            .await
            .map_err(SeatingError::StoreRead)?
            .map(|plan| plan.topology)
            .unwrap_or_default();

        let known: HashSet<&GuestId> = guests.iter().map(|g| &g.id).collect();
        let mut first_seat: HashMap<&GuestId, SeatAssignment> = HashMap::new();
        let mut seat_conflicts = Vec::new();

        for (seat, guest_id) in topology.occupancy() {
            let Some(assignment) = topology.assignment_at(seat) else {
                continue;
            };
            if first_seat.contains_key(guest_id) {
                seat_conflicts.push(Conflict::DuplicateSeating {
                    guest_id: guest_id.clone(),
                    table_id: assignment.table_id,
                    seat_index: assignment.seat_index,
                });
                continue;
            }
            if !known.contains(guest_id) {
                seat_conflicts.push(Conflict::OrphanSeat {
                    guest_id: guest_id.clone(),
                    table_id: assignment.table_id.clone(),
                    seat_index: assignment.seat_index,
                });
            }
            first_seat.insert(guest_id, assignment);
        }

        let mut conflicts: Vec<Conflict> = guests
            .iter()
            .filter_map(|guest| {
                let seating = first_seat.get(&guest.id);
                guest.diverges_from(seating).then(|| Conflict::GuestMismatch {
                    guest_id: guest.id.clone(),
                    seating: seating.cloned(),
                    guest: guest.seat_assignment.clone(),
                })
            })
            .collect();
        conflicts.extend(seat_conflicts);

        debug!(conflicts = conflicts.len(), "conflict scan finished");
        Ok(conflicts)
    }
}
