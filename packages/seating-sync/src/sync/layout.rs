//! Layout operations and undo/redo.
//!
//! Generators push their result onto the history and commit it to the plan
//! with `lastSyncedFrom = "seating"`. Banquet changes then schedule a
//! debounced reconciliation so guest copies follow the new tables.
//! Navigating history never writes; the caller commits with
//! [`SeatingSync::apply_snapshot`].

use std::collections::HashMap;

use tracing::{debug, info};

use super::SeatingSync;
use crate::assign::{self, AssignCandidate, AssignmentOutcome, TableSuggestion};
use crate::bus::SeatingEvent;
use crate::error::{Result, SeatingError, StoreError};
use crate::history::LayoutSnapshot;
use crate::layout::{self, template, BanquetLayoutParams, SeatGridParams};
use crate::model::{CeremonySeat, GuestId, SeatingPlan, SyncSource};
use crate::store::TopologyStore;
use crate::topology::Topology;

impl<S: TopologyStore> SeatingSync<S> {
    /// Generate and commit a ceremony seat grid.
    pub async fn generate_seat_grid(&self, params: &SeatGridParams) -> Result<Vec<CeremonySeat>> {
        let seats = layout::seat_grid(params)?;
        self.commit_ceremony(seats.clone()).await?;
        info!(seats = seats.len(), "ceremony grid generated");
        Ok(seats)
    }

    /// Lay out a built-in ceremony template (rows of chairs) for
    /// `guest_count` guests and commit it. Tables are left alone.
    pub async fn apply_ceremony_template(
        &self,
        template_id: &str,
        guest_count: usize,
    ) -> Result<Vec<CeremonySeat>> {
        let template = template::find_ceremony_template(template_id)?;
        let seats = template::apply_ceremony_template(template, guest_count)?;
        self.commit_ceremony(seats.clone()).await?;
        info!(
            template = template.id,
            guests = guest_count,
            seats = seats.len(),
            "ceremony template applied"
        );
        Ok(seats)
    }

    /// Generate and commit a banquet grid, replacing the current tables.
    pub async fn generate_banquet_layout(&self, params: &BanquetLayoutParams) -> Result<Topology> {
        let topology = layout::banquet_layout(params)?;
        self.commit_layout(topology.clone()).await?;
        info!(tables = topology.table_count(), "banquet layout generated");
        Ok(topology)
    }

    /// Lay out a built-in template for `guest_count` guests in the stored
    /// hall (or the default hall) and commit it.
    pub async fn apply_template(&self, template_id: &str, guest_count: usize) -> Result<Topology> {
        let template = template::find_template(template_id)?;
        let hall = self
            .load_plan()
            .await?
            .and_then(|plan| plan.hall)
            .unwrap_or_default();
        let topology = template::apply_template_in(template, guest_count, &hall);
        self.commit_layout(topology.clone()).await?;
        info!(
            template = template.id,
            guests = guest_count,
            tables = topology.table_count(),
            "template applied"
        );
        Ok(topology)
    }

    /// Remove every table from the plan.
    pub async fn clear_layout(&self) -> Result<()> {
        self.commit_layout(Topology::new()).await?;
        info!("banquet layout cleared");
        Ok(())
    }

    /// Seat `candidates` in the current plan's free seats and commit.
    ///
    /// Candidates prefer tables where a guest of their party already sits,
    /// as recorded on the guest documents. Publishes one `seating` event per
    /// placement.
    pub async fn auto_assign(&self, candidates: &[AssignCandidate]) -> Result<AssignmentOutcome> {
        let mut topology = self
            .load_plan()
            .await?
            .map(|plan| plan.topology)
            .unwrap_or_default();
        let parties: HashMap<GuestId, String> = self
            .inner
            .store
            .list_guests()
            .await
            .map_err(SeatingError::StoreRead)?
            .into_iter()
            .filter_map(|guest| guest.party.map(|party| (guest.id, party)))
            .collect();

        let outcome = assign::auto_assign(&topology, candidates, &parties);
        if outcome.assignments.is_empty() {
            debug!(
                unassigned = outcome.unassigned.len(),
                skipped = outcome.skipped.len(),
                "auto-assign placed nobody"
            );
            return Ok(outcome);
        }
        topology.apply_assignments(&outcome);

        let events: Vec<SeatingEvent> = outcome
            .assignments
            .iter()
            .map(|(guest, seat)| {
                SeatingEvent::new(SyncSource::Seating, guest.clone(), topology.assignment_at(*seat))
            })
            .collect();

        self.commit_layout(topology).await?;
        for event in events {
            self.publish(event);
        }

        info!(
            placed = outcome.placed(),
            unassigned = outcome.unassigned.len(),
            skipped = outcome.skipped.len(),
            "auto-assign committed"
        );
        Ok(outcome)
    }

    /// Rank the plan's tables with room for `guest_id`, preferring tables
    /// where the guest's party already sits.
    pub async fn suggest_tables_for_guest(&self, guest_id: &GuestId) -> Result<Vec<TableSuggestion>> {
        let guests = self
            .inner
            .store
            .list_guests()
            .await
            .map_err(SeatingError::StoreRead)?;
        let party = guests
            .iter()
            .find(|g| &g.id == guest_id)
            .ok_or_else(|| SeatingError::StoreRead(StoreError::NotFound(format!("guests/{}", guest_id))))?
            .party
            .clone();
        let parties: HashMap<GuestId, String> = guests
            .into_iter()
            .filter(|g| &g.id != guest_id)
            .filter_map(|g| g.party.map(|party| (g.id, party)))
            .collect();
        let topology = self
            .load_plan()
            .await?
            .map(|plan| plan.topology)
            .unwrap_or_default();

        Ok(assign::suggest_tables(&topology, party.as_deref(), &parties))
    }

    /// Record a snapshot, discarding the redo future.
    pub fn push_history(&self, snapshot: LayoutSnapshot) {
        self.history().push(snapshot);
    }

    /// Step back. The returned snapshot is not written.
    pub fn undo(&self) -> Option<LayoutSnapshot> {
        self.history().undo()
    }

    /// Step forward. The returned snapshot is not written.
    pub fn redo(&self) -> Option<LayoutSnapshot> {
        self.history().redo()
    }

    pub fn can_undo(&self) -> bool {
        self.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history().can_redo()
    }

    /// Write a snapshot into the plan without touching history.
    ///
    /// A banquet snapshot replaces the tables, a ceremony snapshot the
    /// ceremony seats; the rest of the plan is kept.
    pub async fn apply_snapshot(&self, snapshot: &LayoutSnapshot) -> Result<()> {
        let mut plan = self.load_plan().await?.unwrap_or_else(SeatingPlan::empty);
        match snapshot {
            LayoutSnapshot::Banquet(topology) => plan.topology = Topology::clone(topology),
            LayoutSnapshot::Ceremony(seats) => plan.ceremony_seats = seats.to_vec(),
        }
        plan.touch(SyncSource::Seating);
        self.inner
            .store
            .set_seating_plan(plan, true)
            .await
            .map_err(SeatingError::StoreWrite)?;

        if matches!(snapshot, LayoutSnapshot::Banquet(_)) {
            self.debounced_sync_all();
        }
        Ok(())
    }

    async fn commit_ceremony(&self, seats: Vec<CeremonySeat>) -> Result<()> {
        let snapshot = LayoutSnapshot::ceremony(seats);
        self.push_history(snapshot.clone());
        self.apply_snapshot(&snapshot).await
    }

    async fn commit_layout(&self, topology: Topology) -> Result<()> {
        let snapshot = LayoutSnapshot::banquet(topology);
        self.push_history(snapshot.clone());
        self.apply_snapshot(&snapshot).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{Guest, HallConfig, TableId};
    use crate::scheduler::{ManualScheduler, Scheduler};
    use crate::store::MemoryStore;
    use crate::topology::SeatRef;

    fn engine(store: MemoryStore) -> (SeatingSync<MemoryStore>, Arc<MemoryStore>, Arc<ManualScheduler>) {
        let store = Arc::new(store);
        let scheduler = Arc::new(ManualScheduler::new());
        let engine = SeatingSync::builder(store.clone())
            .with_scheduler(scheduler.clone())
            .build();
        (engine, store, scheduler)
    }

    #[tokio::test]
    async fn test_banquet_layout_committed_and_recorded() {
        let (engine, store, scheduler) = engine(MemoryStore::new());
        let params = BanquetLayoutParams::builder().rows(1).cols(2).seats_per_table(4).build();

        let topology = engine.generate_banquet_layout(&params).await.unwrap();
        assert_eq!(topology.table_count(), 2);

        let plan = store.plan().unwrap();
        assert_eq!(plan.topology, topology);
        assert_eq!(plan.last_synced_from, Some(SyncSource::Seating));
        assert!(scheduler.has_pending());
        assert!(!engine.can_undo());
    }

    #[tokio::test]
    async fn test_seat_grid_keeps_tables() {
        let (engine, store, scheduler) = engine(MemoryStore::new());
        engine
            .generate_banquet_layout(&BanquetLayoutParams::default())
            .await
            .unwrap();
        scheduler.cancel_pending();

        let seats = engine
            .generate_seat_grid(&SeatGridParams::builder().rows(2).cols(2).build())
            .await
            .unwrap();
        assert_eq!(seats.len(), 4);

        let plan = store.plan().unwrap();
        assert_eq!(plan.ceremony_seats, seats);
        assert_eq!(plan.topology.table_count(), 12);
        assert!(!scheduler.has_pending());
    }

    #[tokio::test]
    async fn test_undo_redo_do_not_write() {
        let (engine, store, _) = engine(MemoryStore::new());
        let first = engine
            .generate_banquet_layout(&BanquetLayoutParams::builder().rows(1).cols(1).build())
            .await
            .unwrap();
        engine.clear_layout().await.unwrap();
        let writes = store.stats().plan_writes;

        let previous = engine.undo().unwrap();
        assert_eq!(previous, LayoutSnapshot::banquet(first.clone()));
        assert!(engine.undo().is_none());
        assert_eq!(store.stats().plan_writes, writes);
        assert!(store.plan().unwrap().topology.is_empty());

        engine.apply_snapshot(&previous).await.unwrap();
        assert_eq!(store.plan().unwrap().topology, first);

        assert_eq!(engine.redo(), Some(LayoutSnapshot::banquet(Topology::new())));
        assert!(engine.redo().is_none());
    }

    #[tokio::test]
    async fn test_apply_template_uses_stored_hall() {
        let plan = SeatingPlan {
            hall: Some(HallConfig {
                width: 3000.0,
                height: 2000.0,
                aisle_min: None,
            }),
            ..SeatingPlan::empty()
        };
        let (engine, store, _) = engine(MemoryStore::with_documents([], Some(plan)));

        let topology = engine.apply_template("intimate", 40).await.unwrap();
        assert_eq!(topology.table_count(), 5);

        let stored = store.plan().unwrap();
        assert_eq!(stored.topology, topology);
        assert_eq!(stored.hall.map(|h| h.width), Some(3000.0));
    }

    #[tokio::test]
    async fn test_oversized_grid_writes_nothing() {
        let (engine, store, _) = engine(MemoryStore::new());
        let params = SeatGridParams::builder().rows(70_000).cols(70_000).build();
        let err = engine.generate_seat_grid(&params).await.unwrap_err();
        assert!(matches!(err, SeatingError::InvalidTopology(_)));
        assert!(store.plan().is_none());
        assert!(!engine.can_undo());
    }

    #[tokio::test]
    async fn test_theater_template_fills_ceremony_seats() {
        let (engine, store, scheduler) = engine(MemoryStore::new());
        engine
            .generate_banquet_layout(&BanquetLayoutParams::default())
            .await
            .unwrap();
        scheduler.cancel_pending();

        let seats = engine.apply_ceremony_template("theater", 150).await.unwrap();
        assert_eq!(seats.len(), 150);

        let plan = store.plan().unwrap();
        assert_eq!(plan.ceremony_seats, seats);
        assert_eq!(plan.topology.table_count(), 12);
        assert!(!scheduler.has_pending());
        assert!(engine.can_undo());
    }

    #[tokio::test]
    async fn test_unknown_template_writes_nothing() {
        let (engine, store, _) = engine(MemoryStore::new());
        let err = engine.apply_template("ballroom", 10).await.unwrap_err();
        assert!(matches!(err, SeatingError::UnknownTemplate(_)));
        assert!(store.plan().is_none());
    }

    #[tokio::test]
    async fn test_auto_assign_commits_and_publishes() {
        let (engine, store, _) = engine(MemoryStore::with_documents(
            [Guest::new("g1", "Ana"), Guest::new("g2", "Bo")],
            None,
        ));
        engine
            .generate_banquet_layout(&BanquetLayoutParams::builder().rows(1).cols(1).seats_per_table(1).build())
            .await
            .unwrap();
        let mut events = engine.bus().subscribe();

        let candidates = vec![AssignCandidate::new("g1"), AssignCandidate::new("g2")];
        let outcome = engine.auto_assign(&candidates).await.unwrap();
        assert_eq!(outcome.placed(), 1);
        assert_eq!(outcome.unassigned, vec![GuestId::from("g2")]);

        let plan = store.plan().unwrap();
        let table = plan.topology.find_table(&TableId::from("1")).unwrap();
        assert_eq!(
            plan.topology.locate(&GuestId::from("g1")),
            Some(SeatRef { table, index: 0 })
        );

        let event = events.recv().await.unwrap();
        assert_eq!(event.source, SyncSource::Seating);
        assert_eq!(event.seat_assignment.map(|a| a.table_name), Some("Mesa 1".to_string()));
        assert!(engine.can_undo());
    }

    #[tokio::test]
    async fn test_auto_assign_joins_seated_party() {
        let mut plan = SeatingPlan::empty();
        for id in ["T1", "T2"] {
            plan.topology
                .push_table(crate::topology::TableDraft {
                    id: TableId::from(id),
                    name: format!("Mesa {}", id),
                    shape: crate::topology::TableShape::Circle,
                    width: 120.0,
                    height: 120.0,
                    x: 0.0,
                    y: 0.0,
                    capacity: 4,
                })
                .unwrap();
        }
        let t2 = plan.topology.find_table(&TableId::from("T2")).unwrap();
        plan.topology.occupy(SeatRef { table: t2, index: 0 }, GuestId::from("s1"));
        let (engine, store, _) = engine(MemoryStore::with_documents(
            [
                Guest::new("s1", "Sam").with_party("smith"),
                Guest::new("x", "Xavi").with_party("smith"),
            ],
            Some(plan),
        ));

        let outcome = engine
            .auto_assign(&[AssignCandidate::new("x").in_party("smith")])
            .await
            .unwrap();
        assert_eq!(outcome.placed(), 1);

        let stored = store.plan().unwrap().topology;
        let seat = stored.locate(&GuestId::from("x")).unwrap();
        assert_eq!(
            stored.assignment_at(seat).map(|a| a.table_id),
            Some(TableId::from("T2"))
        );
    }

    #[tokio::test]
    async fn test_suggestions_follow_seated_party() {
        let (engine, _, _) = engine(MemoryStore::with_documents(
            [
                Guest::new("s1", "Sam").with_party("smith"),
                Guest::new("x", "Xavi").with_party("smith"),
            ],
            None,
        ));
        engine
            .generate_banquet_layout(&BanquetLayoutParams::builder().rows(1).cols(3).seats_per_table(4).build())
            .await
            .unwrap();
        engine
            .auto_assign(&[AssignCandidate::new("filler"), AssignCandidate::new("s1")])
            .await
            .unwrap();

        let ranked = engine.suggest_tables_for_guest(&GuestId::from("x")).await.unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].table_id, TableId::from("1"));
        assert_eq!(ranked[0].party_members, 1);
        assert_eq!(ranked[1].free_seats, 4);

        let err = engine
            .suggest_tables_for_guest(&GuestId::from("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn test_auto_assign_without_plan_places_nobody() {
        let (engine, store, _) = engine(MemoryStore::new());
        let outcome = engine
            .auto_assign(&[AssignCandidate::new("g1")])
            .await
            .unwrap();
        assert_eq!(outcome.unassigned, vec![GuestId::from("g1")]);
        assert!(store.plan().is_none());
    }
}
