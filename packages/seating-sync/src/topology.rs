//! Arena representation of a seating topology.
//!
//! Tables and seats live in two flat vectors. Each table owns a contiguous,
//! fixed-length range of the seat vector, so a table's capacity cannot change
//! through assignment. Seats are addressed by [`SeatRef`] (table handle plus
//! seat index) and tables by [`TableHandle`].
//!
//! On the wire a topology is the nested `tables[].seats[]` document:
//!
//! ```text
//! [
//!   { "id": "1", "name": "Mesa 1", "shape": "rectangle", ...,
//!     "seats": [ { "index": 0, "guestId": "g1", "occupied": true },
//!                { "index": 1, "guestId": null, "occupied": false } ] }
//! ]
//! ```
//!
//! Loading rejects duplicate table ids and seats whose `index` is not their
//! position. The serialized `occupied` flag is ignored: occupancy is always
//! derived from `guestId`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::SeatingError;
use crate::model::{GuestId, SeatAssignment, TableId};

/// Table outline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableShape {
    Circle,
    #[default]
    Rectangle,
    Hexagon,
}

impl TableShape {
    /// Default footprint `(width, height)` for a table of this shape.
    pub fn footprint(self, capacity: u32) -> (f64, f64) {
        match self {
            TableShape::Circle => (120.0, 120.0),
            TableShape::Hexagon => (130.0, 130.0),
            TableShape::Rectangle => ((f64::from(capacity) / 2.0 * 40.0).max(80.0), 60.0),
        }
    }
}

/// Index of a table inside its topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableHandle(usize);

impl TableHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Address of one seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeatRef {
    pub table: TableHandle,
    pub index: u32,
}

/// One seat. `occupied()` is `guest_id().is_some()` by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    index: u32,
    guest_id: Option<GuestId>,
}

impl Seat {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn guest_id(&self) -> Option<&GuestId> {
        self.guest_id.as_ref()
    }

    pub fn occupied(&self) -> bool {
        self.guest_id.is_some()
    }
}

/// A table and the location of its seats in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub id: TableId,
    pub name: String,
    pub shape: TableShape,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    seat_start: usize,
    seat_count: usize,
}

impl Table {
    pub fn capacity(&self) -> usize {
        self.seat_count
    }
}

/// Everything needed to add a table: geometry plus a fixed capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDraft {
    pub id: TableId,
    pub name: String,
    pub shape: TableShape,
    pub width: f64,
    pub height: f64,
    pub x: f64,
    pub y: f64,
    pub capacity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TableDoc>", into = "Vec<TableDoc>")]
pub struct Topology {
    tables: Vec<Table>,
    seats: Vec<Seat>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Total seats across all tables.
    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    pub fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|s| s.occupied()).count()
    }

    /// Append a table with `draft.capacity` empty seats.
    pub fn push_table(&mut self, draft: TableDraft) -> Result<TableHandle, SeatingError> {
        if self.find_table(&draft.id).is_some() {
            return Err(SeatingError::InvalidTopology(format!(
                "duplicate table id {}",
                draft.id
            )));
        }
        Ok(self.append_table(draft))
    }

    /// Append without the duplicate-id check. Generators number their tables
    /// sequentially, so the ids are unique by construction.
    pub(crate) fn append_table(&mut self, draft: TableDraft) -> TableHandle {
        let seat_start = self.seats.len();
        self.seats.extend((0..draft.capacity).map(|index| Seat {
            index,
            guest_id: None,
        }));
        self.tables.push(Table {
            id: draft.id,
            name: draft.name,
            shape: draft.shape,
            width: draft.width,
            height: draft.height,
            x: draft.x,
            y: draft.y,
            seat_start,
            seat_count: draft.capacity as usize,
        });
        TableHandle(self.tables.len() - 1)
    }

    pub fn tables(&self) -> impl Iterator<Item = (TableHandle, &Table)> + '_ {
        self.tables
            .iter()
            .enumerate()
            .map(|(i, t)| (TableHandle(i), t))
    }

    pub fn table(&self, handle: TableHandle) -> Option<&Table> {
        self.tables.get(handle.0)
    }

    pub fn find_table(&self, id: &TableId) -> Option<TableHandle> {
        self.tables.iter().position(|t| &t.id == id).map(TableHandle)
    }

    pub fn seats(&self, handle: TableHandle) -> &[Seat] {
        match self.tables.get(handle.0) {
            Some(t) => &self.seats[t.seat_start..t.seat_start + t.seat_count],
            None => &[],
        }
    }

    pub fn seat(&self, seat: SeatRef) -> Option<&Seat> {
        self.seats(seat.table).get(seat.index as usize)
    }

    fn seat_mut(&mut self, seat: SeatRef) -> Option<&mut Seat> {
        let table = self.tables.get(seat.table.0)?;
        if seat.index as usize >= table.seat_count {
            return None;
        }
        self.seats.get_mut(table.seat_start + seat.index as usize)
    }

    pub fn free_seats(&self, handle: TableHandle) -> usize {
        self.seats(handle).iter().filter(|s| !s.occupied()).count()
    }

    /// Lowest unoccupied seat index of a table.
    pub fn first_free_seat(&self, handle: TableHandle) -> Option<SeatRef> {
        self.seats(handle)
            .iter()
            .find(|s| !s.occupied())
            .map(|s| SeatRef {
                table: handle,
                index: s.index,
            })
    }

    /// Put `guest` on `seat` if it exists and is free.
    pub fn occupy(&mut self, seat: SeatRef, guest: GuestId) -> bool {
        match self.seat_mut(seat) {
            Some(s) if !s.occupied() => {
                s.guest_id = Some(guest);
                true
            }
            _ => false,
        }
    }

    /// Clear every seat holding `guest`. Returns how many seats were freed.
    pub fn vacate_guest(&mut self, guest: &GuestId) -> usize {
        let mut freed = 0;
        for seat in self.seats.iter_mut() {
            if seat.guest_id.as_ref() == Some(guest) {
                seat.guest_id = None;
                freed += 1;
            }
        }
        freed
    }

    /// First seat (table order, then seat order) holding `guest`.
    pub fn locate(&self, guest: &GuestId) -> Option<SeatRef> {
        self.occupancy()
            .find(|(_, g)| *g == guest)
            .map(|(seat, _)| seat)
    }

    /// Every occupied seat, in table order then seat order.
    pub fn occupancy(&self) -> impl Iterator<Item = (SeatRef, &GuestId)> + '_ {
        self.tables().flat_map(move |(handle, _)| {
            self.seats(handle).iter().filter_map(move |s| {
                s.guest_id.as_ref().map(|g| {
                    (
                        SeatRef {
                            table: handle,
                            index: s.index,
                        },
                        g,
                    )
                })
            })
        })
    }

    /// The guest-document view of a seat.
    pub fn assignment_at(&self, seat: SeatRef) -> Option<SeatAssignment> {
        let table = self.table(seat.table)?;
        self.seat(seat)?;
        Some(SeatAssignment {
            table_id: table.id.clone(),
            table_name: table.name.clone(),
            seat_index: seat.index,
        })
    }

    /// Vacate every seating of a guest after their first one.
    ///
    /// Returns the guests and seats that were cleared.
    pub fn dedupe_guests(&mut self) -> Vec<(GuestId, SeatRef)> {
        let mut seen = HashSet::new();
        let duplicates: Vec<(GuestId, SeatRef)> = self
            .occupancy()
            .filter(|(_, g)| !seen.insert((*g).clone()))
            .map(|(seat, g)| (g.clone(), seat))
            .collect();
        for (_, seat) in &duplicates {
            if let Some(s) = self.seat_mut(*seat) {
                s.guest_id = None;
            }
        }
        duplicates
    }
}

// ============================================================================
// Wire document
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeatDoc {
    index: u32,
    #[serde(default)]
    guest_id: Option<GuestId>,
    #[serde(default)]
    occupied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableDoc {
    id: TableId,
    name: String,
    #[serde(default)]
    shape: TableShape,
    width: f64,
    height: f64,
    x: f64,
    y: f64,
    #[serde(default)]
    seats: Vec<SeatDoc>,
}

impl TryFrom<Vec<TableDoc>> for Topology {
    type Error = SeatingError;

    fn try_from(docs: Vec<TableDoc>) -> Result<Self, Self::Error> {
        let mut topology = Topology::new();
        for doc in docs {
            for (position, seat) in doc.seats.iter().enumerate() {
                if seat.index as usize != position {
                    return Err(SeatingError::InvalidTopology(format!(
                        "table {} has seat index {} at position {}",
                        doc.id, seat.index, position
                    )));
                }
            }
            let handle = topology.push_table(TableDraft {
                id: doc.id,
                name: doc.name,
                shape: doc.shape,
                width: doc.width,
                height: doc.height,
                x: doc.x,
                y: doc.y,
                capacity: doc.seats.len() as u32,
            })?;
            for seat in doc.seats {
                if let Some(guest) = seat.guest_id {
                    topology.occupy(
                        SeatRef {
                            table: handle,
                            index: seat.index,
                        },
                        guest,
                    );
                }
            }
        }
        Ok(topology)
    }
}

impl From<Topology> for Vec<TableDoc> {
    fn from(topology: Topology) -> Self {
        topology
            .tables
            .iter()
            .map(|t| TableDoc {
                id: t.id.clone(),
                name: t.name.clone(),
                shape: t.shape,
                width: t.width,
                height: t.height,
                x: t.x,
                y: t.y,
                seats: topology.seats[t.seat_start..t.seat_start + t.seat_count]
                    .iter()
                    .map(|s| SeatDoc {
                        index: s.index,
                        guest_id: s.guest_id.clone(),
                        occupied: s.occupied(),
                    })
                    .collect(),
            })
            .collect()
    }
}
