//! The two directed write paths.
//!
//! Each path writes only its own side and announces the change on the bus;
//! the other side catches up in the next reconciliation pass.

use tracing::{debug, info, warn};

use super::SeatingSync;
use crate::bus::SeatingEvent;
use crate::error::{Result, SeatingError};
use crate::model::{GuestId, GuestPatch, SeatAssignment, SeatingPlan, SyncSource, TableId};
use crate::store::TopologyStore;

impl<S: TopologyStore> SeatingSync<S> {
    /// Copy a seat (or its absence) from the plan onto the guest document.
    ///
    /// Fails with [`SeatingError::StoreWrite`] if the guest cannot be written,
    /// including when it does not exist.
    pub async fn sync_seating_to_guest(
        &self,
        guest_id: &GuestId,
        assignment: Option<SeatAssignment>,
    ) -> Result<()> {
        let patch = GuestPatch::seating(assignment.clone(), SyncSource::Seating);
        self.inner
            .store
            .update_guest(guest_id, patch)
            .await
            .map_err(SeatingError::StoreWrite)?;

        debug!(
            guest_id = %guest_id,
            table_id = assignment.as_ref().map(|a| a.table_id.as_str()),
            "guest seat updated from seating plan"
        );
        self.publish(SeatingEvent::new(SyncSource::Seating, guest_id.clone(), assignment));
        Ok(())
    }

    /// Move a guest in the seating plan.
    ///
    /// The guest is first removed from any seat holding them; then, if
    /// `table_id` is given, seated at that table's lowest free seat. Returns
    /// the seat actually taken.
    ///
    /// A missing plan is created empty and nothing is assigned. A full table
    /// fails with [`SeatingError::TableFull`] and writes nothing. An unknown
    /// table still removes the guest from their old seat.
    pub async fn sync_guest_to_seating(
        &self,
        guest_id: &GuestId,
        table_id: Option<&TableId>,
    ) -> Result<Option<SeatAssignment>> {
        let stored = self
            .inner
            .store
            .get_seating_plan()
            .await
            .map_err(SeatingError::StoreRead)?;

        let Some(mut plan) = stored else {
            let mut plan = SeatingPlan::empty();
            plan.touch(SyncSource::Guests);
            self.inner
                .store
                .set_seating_plan(plan, true)
                .await
                .map_err(SeatingError::StoreWrite)?;
            info!(guest_id = %guest_id, "seating plan not found, bootstrapped an empty one");
            return Ok(None);
        };

        let freed = plan.topology.vacate_guest(guest_id);

        let taken = match table_id {
            None => None,
            Some(table_id) => match plan.topology.find_table(table_id) {
                None => {
                    warn!(
                        guest_id = %guest_id,
                        table_id = %table_id,
                        "target table not in seating plan, guest only unseated"
                    );
                    None
                }
                Some(table) => {
                    let seat = plan.topology.first_free_seat(table).ok_or_else(|| {
                        SeatingError::TableFull {
                            table_id: table_id.clone(),
                        }
                    })?;
                    plan.topology.occupy(seat, guest_id.clone());
                    plan.topology.assignment_at(seat)
                }
            },
        };

        plan.touch(SyncSource::Guests);
        self.inner
            .store
            .set_seating_plan(plan, true)
            .await
            .map_err(SeatingError::StoreWrite)?;

        debug!(
            guest_id = %guest_id,
            freed,
            seat = taken.as_ref().map(|a| a.seat_index),
            "seating plan updated from guest"
        );
        self.publish(SeatingEvent::new(SyncSource::Guests, guest_id.clone(), taken.clone()));
        Ok(taken)
    }
}
