//! Greedy auto-assignment of guests to free seats.
//!
//! Guests are placed in input order. A guest whose party already sits at a
//! table, either seated before the run or placed earlier in it, joins the
//! first such table with room; everyone else takes the first table, in
//! topology order, with a free seat. The seat is always the lowest free
//! index. Nothing here is random, so identical inputs give identical
//! outcomes.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{Guest, GuestId, TableId};
use crate::topology::{SeatRef, TableHandle, Topology};

/// A guest to place, with its optional party key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignCandidate {
    pub guest_id: GuestId,
    #[serde(default)]
    pub party: Option<String>,
}

impl AssignCandidate {
    pub fn new(guest_id: impl Into<GuestId>) -> Self {
        Self {
            guest_id: guest_id.into(),
            party: None,
        }
    }

    pub fn in_party(mut self, party: impl Into<String>) -> Self {
        self.party = Some(party.into());
        self
    }
}

impl From<&Guest> for AssignCandidate {
    fn from(guest: &Guest) -> Self {
        Self {
            guest_id: guest.id.clone(),
            party: guest.party.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentOutcome {
    /// Placements, in the order they were made.
    pub assignments: Vec<(GuestId, SeatRef)>,
    /// Guests for whom no seat was left.
    pub unassigned: Vec<GuestId>,
    /// Guests already seated in the topology, or repeated in the input.
    pub skipped: Vec<GuestId>,
}

impl AssignmentOutcome {
    pub fn as_map(&self) -> BTreeMap<GuestId, SeatRef> {
        self.assignments.iter().cloned().collect()
    }

    pub fn placed(&self) -> usize {
        self.assignments.len()
    }
}

/// Compute placements for `candidates` without touching `topology`.
///
/// `parties` maps guests already seated in `topology` to their party key, so
/// a candidate can join a table their party occupies.
pub fn auto_assign(
    topology: &Topology,
    candidates: &[AssignCandidate],
    parties: &HashMap<GuestId, String>,
) -> AssignmentOutcome {
    let mut free: Vec<(TableHandle, Vec<u32>)> = topology
        .tables()
        .map(|(handle, _)| {
            let open = topology
                .seats(handle)
                .iter()
                .filter(|s| !s.occupied())
                .map(|s| s.index())
                .collect();
            (handle, open)
        })
        .collect();
    // Remaining free seats are consumed from the front, lowest index first.
    for (_, open) in free.iter_mut() {
        open.reverse();
    }

    let slots: HashMap<TableHandle, usize> = free
        .iter()
        .enumerate()
        .map(|(slot, (handle, _))| (*handle, slot))
        .collect();

    let mut seen: HashSet<&GuestId> = topology.occupancy().map(|(_, g)| g).collect();
    let mut party_tables: HashMap<&str, Vec<usize>> = HashMap::new();
    for (seat, guest) in topology.occupancy() {
        if let (Some(party), Some(&slot)) = (parties.get(guest), slots.get(&seat.table)) {
            join_party(&mut party_tables, party, slot);
        }
    }
    let mut outcome = AssignmentOutcome::default();

    for candidate in candidates {
        if !seen.insert(&candidate.guest_id) {
            outcome.skipped.push(candidate.guest_id.clone());
            continue;
        }

        let party_slot = candidate
            .party
            .as_deref()
            .and_then(|p| party_tables.get(p))
            .and_then(|tables| tables.iter().copied().find(|&slot| !free[slot].1.is_empty()));
        let slot = party_slot.or_else(|| free.iter().position(|(_, open)| !open.is_empty()));

        match slot {
            Some(slot) => {
                let (handle, open) = &mut free[slot];
                if let Some(index) = open.pop() {
                    outcome.assignments.push((
                        candidate.guest_id.clone(),
                        SeatRef {
                            table: *handle,
                            index,
                        },
                    ));
                    if let Some(party) = candidate.party.as_deref() {
                        join_party(&mut party_tables, party, slot);
                    }
                }
            }
            None => outcome.unassigned.push(candidate.guest_id.clone()),
        }
    }

    outcome
}

/// One ranked table for [`suggest_tables`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSuggestion {
    pub table_id: TableId,
    pub table_name: String,
    pub free_seats: usize,
    /// Guests of the asking guest's party already at this table.
    pub party_members: usize,
}

/// Tables with a free seat, best first: most party members, then most free
/// seats, then topology order.
pub fn suggest_tables(
    topology: &Topology,
    party: Option<&str>,
    parties: &HashMap<GuestId, String>,
) -> Vec<TableSuggestion> {
    let mut ranked: Vec<TableSuggestion> = topology
        .tables()
        .filter_map(|(handle, table)| {
            let free_seats = topology.free_seats(handle);
            if free_seats == 0 {
                return None;
            }
            let party_members = match party {
                Some(party) => topology
                    .seats(handle)
                    .iter()
                    .filter_map(|seat| seat.guest_id())
                    .filter(|guest| parties.get(*guest).map(String::as_str) == Some(party))
                    .count(),
                None => 0,
            };
            Some(TableSuggestion {
                table_id: table.id.clone(),
                table_name: table.name.clone(),
                free_seats,
                party_members,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.party_members
            .cmp(&a.party_members)
            .then(b.free_seats.cmp(&a.free_seats))
    });
    ranked
}

fn join_party<'a>(party_tables: &mut HashMap<&'a str, Vec<usize>>, party: &'a str, slot: usize) {
    let tables = party_tables.entry(party).or_default();
    if !tables.contains(&slot) {
        tables.push(slot);
        tables.sort_unstable();
    }
}

impl Topology {
    /// Apply an outcome computed against this topology.
    ///
    /// Returns how many placements landed. A placement whose seat was taken
    /// in the meantime is dropped.
    pub fn apply_assignments(&mut self, outcome: &AssignmentOutcome) -> usize {
        outcome
            .assignments
            .iter()
            .filter(|(guest, seat)| self.occupy(*seat, guest.clone()))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{TableDraft, TableShape};

    fn topology(capacities: &[u32]) -> Topology {
        let mut topology = Topology::new();
        for (i, capacity) in capacities.iter().enumerate() {
            topology
                .push_table(TableDraft {
                    id: TableId::new(format!("T{}", i + 1)),
                    name: format!("Mesa {}", i + 1),
                    shape: TableShape::Circle,
                    width: 120.0,
                    height: 120.0,
                    x: 0.0,
                    y: 0.0,
                    capacity: *capacity,
                })
                .unwrap();
        }
        topology
    }

    fn handle(topology: &Topology, id: &str) -> TableHandle {
        topology.find_table(&TableId::from(id)).unwrap()
    }

    #[test]
    fn test_fills_tables_in_order() {
        let plan = topology(&[2, 2]);
        let candidates: Vec<_> = ["a", "b", "c"].iter().map(|g| AssignCandidate::new(*g)).collect();
        let outcome = auto_assign(&plan, &candidates, &HashMap::new());

        let map = outcome.as_map();
        assert_eq!(map[&GuestId::from("a")], SeatRef { table: handle(&plan, "T1"), index: 0 });
        assert_eq!(map[&GuestId::from("b")], SeatRef { table: handle(&plan, "T1"), index: 1 });
        assert_eq!(map[&GuestId::from("c")], SeatRef { table: handle(&plan, "T2"), index: 0 });
        assert!(outcome.unassigned.is_empty());
    }

    #[test]
    fn test_overflow_goes_to_unassigned() {
        let plan = topology(&[1]);
        let candidates = vec![AssignCandidate::new("a"), AssignCandidate::new("b")];
        let outcome = auto_assign(&plan, &candidates, &HashMap::new());
        assert_eq!(outcome.placed(), 1);
        assert_eq!(outcome.unassigned, vec![GuestId::from("b")]);
    }

    #[test]
    fn test_party_stays_together() {
        let plan = topology(&[3, 3]);
        let candidates = vec![
            AssignCandidate::new("a"),
            AssignCandidate::new("b").in_party("smith"),
            AssignCandidate::new("c"),
            AssignCandidate::new("d"),
            AssignCandidate::new("e").in_party("smith"),
        ];
        let outcome = auto_assign(&plan, &candidates, &HashMap::new());
        let map = outcome.as_map();
        // "b" took T1 seat 1; "c" filled T1; "e" follows the party but T1 is
        // full, so it falls back to the first table with room.
        assert_eq!(map[&GuestId::from("b")].table, handle(&plan, "T1"));
        assert_eq!(map[&GuestId::from("d")].table, handle(&plan, "T2"));
        assert_eq!(map[&GuestId::from("e")], SeatRef { table: handle(&plan, "T2"), index: 1 });
    }

    #[test]
    fn test_party_table_preferred_over_first_free() {
        let mut plan = topology(&[2, 3]);
        let t1 = handle(&plan, "T1");
        plan.occupy(SeatRef { table: t1, index: 0 }, GuestId::from("seated"));
        let candidates = vec![
            AssignCandidate::new("x").in_party("jones"),
            AssignCandidate::new("y"),
            AssignCandidate::new("z").in_party("jones"),
        ];
        let outcome = auto_assign(&plan, &candidates, &HashMap::new());
        let map = outcome.as_map();
        assert_eq!(map[&GuestId::from("x")], SeatRef { table: t1, index: 1 });
        // T1 is now full; "z" lands on T2 after "y".
        assert_eq!(map[&GuestId::from("z")], SeatRef { table: handle(&plan, "T2"), index: 1 });
    }

    #[test]
    fn test_joins_table_of_seated_party_member() {
        let mut plan = topology(&[4, 4]);
        let t2 = handle(&plan, "T2");
        plan.occupy(SeatRef { table: t2, index: 0 }, GuestId::from("s1"));
        let parties = HashMap::from([(GuestId::from("s1"), "smith".to_string())]);

        let candidates = vec![
            AssignCandidate::new("x").in_party("smith"),
            AssignCandidate::new("y").in_party("jones"),
        ];
        let outcome = auto_assign(&plan, &candidates, &parties);
        let map = outcome.as_map();
        assert_eq!(map[&GuestId::from("x")], SeatRef { table: t2, index: 1 });
        assert_eq!(map[&GuestId::from("y")].table, handle(&plan, "T1"));
    }

    #[test]
    fn test_full_party_table_falls_through_to_next_party_table() {
        let mut plan = topology(&[3, 1, 2]);
        let t2 = handle(&plan, "T2");
        let t3 = handle(&plan, "T3");
        plan.occupy(SeatRef { table: t2, index: 0 }, GuestId::from("s1"));
        plan.occupy(SeatRef { table: t3, index: 0 }, GuestId::from("s2"));
        let parties = HashMap::from([
            (GuestId::from("s1"), "smith".to_string()),
            (GuestId::from("s2"), "smith".to_string()),
        ]);

        let outcome = auto_assign(&plan, &[AssignCandidate::new("x").in_party("smith")], &parties);
        assert_eq!(outcome.as_map()[&GuestId::from("x")], SeatRef { table: t3, index: 1 });
    }

    #[test]
    fn test_suggestions_rank_party_then_room() {
        let mut plan = topology(&[2, 5, 3, 1]);
        let t1 = handle(&plan, "T1");
        let t3 = handle(&plan, "T3");
        let t4 = handle(&plan, "T4");
        plan.occupy(SeatRef { table: t3, index: 0 }, GuestId::from("s1"));
        plan.occupy(SeatRef { table: t4, index: 0 }, GuestId::from("s2"));
        let parties = HashMap::from([
            (GuestId::from("s1"), "smith".to_string()),
            (GuestId::from("s2"), "smith".to_string()),
        ]);

        let ranked: Vec<_> = suggest_tables(&plan, Some("smith"), &parties)
            .into_iter()
            .map(|s| (s.table_id.to_string(), s.free_seats, s.party_members))
            .collect();
        // T4 is full and left out.
        assert_eq!(
            ranked,
            vec![
                ("T3".to_string(), 2, 1),
                ("T2".to_string(), 5, 0),
                ("T1".to_string(), 2, 0),
            ]
        );

        let without_party = suggest_tables(&plan, None, &parties);
        assert_eq!(without_party[0].table_id, TableId::from("T2"));
        assert_eq!(plan.free_seats(t1), 2);
    }

    #[test]
    fn test_seated_and_repeated_guests_skipped() {
        let mut plan = topology(&[4]);
        let t1 = handle(&plan, "T1");
        plan.occupy(SeatRef { table: t1, index: 2 }, GuestId::from("a"));
        let candidates = vec![
            AssignCandidate::new("a"),
            AssignCandidate::new("b"),
            AssignCandidate::new("b"),
        ];
        let outcome = auto_assign(&plan, &candidates, &HashMap::new());
        assert_eq!(outcome.skipped, vec![GuestId::from("a"), GuestId::from("b")]);
        assert_eq!(outcome.assignments, vec![(GuestId::from("b"), SeatRef { table: t1, index: 0 })]);
    }

    #[test]
    fn test_identical_inputs_identical_outputs() {
        let plan = topology(&[3, 5, 2]);
        let mut rng = fastrand::Rng::with_seed(7);
        let candidates: Vec<_> = (0..12)
            .map(|i| {
                let c = AssignCandidate::new(format!("g{}", i));
                if rng.bool() {
                    c.in_party(format!("p{}", rng.u8(0..3)))
                } else {
                    c
                }
            })
            .collect();
        assert_eq!(auto_assign(&plan, &candidates, &HashMap::new()), auto_assign(&plan, &candidates, &HashMap::new()));
    }

    #[test]
    fn test_applied_outcome_keeps_seats_exclusive() {
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..20 {
            let capacities: Vec<u32> = (0..rng.usize(1..6)).map(|_| rng.u32(0..6)).collect();
            let mut plan = topology(&capacities);
            let candidates: Vec<_> = (0..rng.usize(0..30))
                .map(|_| AssignCandidate::new(format!("g{}", rng.u8(0..25))))
                .collect();

            let outcome = auto_assign(&plan, &candidates, &HashMap::new());
            assert_eq!(plan.apply_assignments(&outcome), outcome.placed());

            let mut guests = HashSet::new();
            for (_, guest) in plan.occupancy() {
                assert!(guests.insert(guest.clone()), "guest {} seated twice", guest);
            }
            assert!(plan.occupied_count() <= plan.capacity());
        }
    }
}
