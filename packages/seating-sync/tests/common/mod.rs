// Common test utilities
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use seating_sync::store::MemoryStore;
use seating_sync::{
    Guest, GuestId, ManualScheduler, SeatingPlan, SeatingSync, TableDraft, TableId, TableShape,
    Topology,
};

/// Plan with one rectangular table per `(id, capacity)`, all seats empty.
pub fn plan(tables: &[(&str, u32)]) -> SeatingPlan {
    let mut topology = Topology::new();
    for (id, capacity) in tables {
        topology
            .push_table(TableDraft {
                id: TableId::from(*id),
                name: format!("Mesa {}", id),
                shape: TableShape::Rectangle,
                width: 80.0,
                height: 60.0,
                x: 0.0,
                y: 0.0,
                capacity: *capacity,
            })
            .unwrap();
    }
    SeatingPlan {
        topology,
        ..SeatingPlan::empty()
    }
}

pub fn guests(ids: &[&str]) -> Vec<Guest> {
    ids.iter().map(|id| Guest::new(*id, format!("Guest {}", id))).collect()
}

/// Engine whose debounced passes only run when the test fires them.
pub fn manual_engine(
    store: MemoryStore,
) -> (SeatingSync<MemoryStore>, Arc<MemoryStore>, Arc<ManualScheduler>) {
    let store = Arc::new(store);
    let scheduler = Arc::new(ManualScheduler::new());
    let engine = SeatingSync::builder(store.clone())
        .with_scheduler(scheduler.clone())
        .build();
    (engine, store, scheduler)
}

/// `(table id, seat index)` the guest's own record points at.
pub fn guest_seat(store: &MemoryStore, guest: &str) -> Option<(String, u32)> {
    store
        .guest(&GuestId::from(guest))
        .and_then(|g| g.seat_assignment)
        .map(|a| (a.table_id.to_string(), a.seat_index))
}

/// `(table id, seat index)` the plan puts the guest at.
pub fn plan_seat(store: &MemoryStore, guest: &str) -> Option<(String, u32)> {
    let plan = store.plan()?;
    let seat = plan.topology.locate(&GuestId::from(guest))?;
    let assignment = plan.topology.assignment_at(seat)?;
    Some((assignment.table_id.to_string(), assignment.seat_index))
}

/// Panics if any guest holds two seats.
pub fn assert_exclusive(topology: &Topology) {
    let mut seen = HashSet::new();
    for (_, guest) in topology.occupancy() {
        assert!(seen.insert(guest.clone()), "guest {} holds two seats", guest);
    }
}

pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
