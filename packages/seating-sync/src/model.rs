//! Documents and identifiers shared by the stores and the engine.
//!
//! Guests and tables are addressed by caller-assigned string ids. The newtypes
//! keep a guest id from being passed where a table id is expected.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::topology::Topology;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Stable, externally assigned guest identifier.
    GuestId
);

string_id!(
    /// Table identifier, unique within one seating plan.
    TableId
);

// ============================================================================
// Sync source marker
// ============================================================================

/// Which side of the system produced a write or an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncSource {
    /// The seating plan (seat grid) side.
    #[serde(rename = "seating")]
    Seating,
    /// The guest record side.
    #[serde(rename = "guests")]
    Guests,
    /// The reconciliation pass itself.
    #[serde(rename = "auto-sync")]
    AutoSync,
}

impl fmt::Display for SyncSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncSource::Seating => write!(f, "seating"),
            SyncSource::Guests => write!(f, "guests"),
            SyncSource::AutoSync => write!(f, "auto-sync"),
        }
    }
}

// ============================================================================
// Guest documents
// ============================================================================

/// Where a guest sits, as denormalized onto the guest document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatAssignment {
    pub table_id: TableId,
    pub table_name: String,
    pub seat_index: u32,
}

/// A guest record as owned by the guest collaborator.
///
/// The engine only ever touches `seat_assignment`, the `table_id`/`table`
/// mirrors, `updated_at` and `last_synced_from`, and always all of them at
/// once through a [`GuestPatch`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: GuestId,
    pub name: String,
    #[serde(default)]
    pub seat_assignment: Option<SeatAssignment>,
    /// Legacy mirror of `seat_assignment.table_id`.
    #[serde(default)]
    pub table_id: Option<TableId>,
    /// Legacy mirror of `seat_assignment.table_name`.
    #[serde(default)]
    pub table: Option<String>,
    /// Grouping key used by auto-assignment to keep a party together.
    #[serde(default)]
    pub party: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_synced_from: Option<SyncSource>,
}

impl Guest {
    pub fn new(id: impl Into<GuestId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            seat_assignment: None,
            table_id: None,
            table: None,
            party: None,
            updated_at: None,
            last_synced_from: None,
        }
    }

    pub fn with_party(mut self, party: impl Into<String>) -> Self {
        self.party = Some(party.into());
        self
    }

    /// Returns true when the guest-side copy (assignment and both mirrors)
    /// disagrees with `expected`.
    pub fn diverges_from(&self, expected: Option<&SeatAssignment>) -> bool {
        if self.seat_assignment.as_ref() != expected {
            return true;
        }
        let table_id = expected.map(|a| &a.table_id);
        let table = expected.map(|a| a.table_name.as_str());
        self.table_id.as_ref() != table_id || self.table.as_deref() != table
    }

    pub fn apply(&mut self, patch: &GuestPatch) {
        self.seat_assignment = patch.seat_assignment.clone();
        self.table_id = patch.table_id.clone();
        self.table = patch.table.clone();
        self.updated_at = Some(patch.updated_at);
        self.last_synced_from = Some(patch.last_synced_from);
    }
}

/// The engine-owned fields of a guest document, written together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestPatch {
    pub seat_assignment: Option<SeatAssignment>,
    pub table_id: Option<TableId>,
    pub table: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub last_synced_from: SyncSource,
}

impl GuestPatch {
    /// Build a patch whose mirrors follow `assignment`.
    pub fn seating(assignment: Option<SeatAssignment>, source: SyncSource) -> Self {
        Self {
            table_id: assignment.as_ref().map(|a| a.table_id.clone()),
            table: assignment.as_ref().map(|a| a.table_name.clone()),
            seat_assignment: assignment,
            updated_at: Utc::now(),
            last_synced_from: source,
        }
    }
}

// ============================================================================
// Seating plan document
// ============================================================================

/// One seat of the ceremony grid (rows of chairs, no tables).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonySeat {
    pub id: u32,
    pub x: f64,
    pub y: f64,
    pub enabled: bool,
    #[serde(default)]
    pub guest_id: Option<GuestId>,
}

/// Hall dimensions kept alongside the banquet layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HallConfig {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub aisle_min: Option<f64>,
}

impl Default for HallConfig {
    fn default() -> Self {
        Self {
            width: 1800.0,
            height: 1200.0,
            aisle_min: None,
        }
    }
}

/// The single seating-plan document of an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingPlan {
    #[serde(rename = "tables", default)]
    pub topology: Topology,
    #[serde(default)]
    pub ceremony_seats: Vec<CeremonySeat>,
    #[serde(default)]
    pub hall: Option<HallConfig>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_synced_from: Option<SyncSource>,
}

impl SeatingPlan {
    /// An empty plan, as created on first touch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Stamp the plan before a write.
    pub fn touch(&mut self, source: SyncSource) {
        self.updated_at = Some(Utc::now());
        self.last_synced_from = Some(source);
    }

    /// Fold `incoming` over `self` the way a merge write does: fields the
    /// incoming document leaves empty keep their stored value.
    pub fn merge_from(&mut self, incoming: SeatingPlan) {
        let hall = incoming.hall.or_else(|| self.hall.take());
        *self = SeatingPlan { hall, ..incoming };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(table: &str, seat: u32) -> SeatAssignment {
        SeatAssignment {
            table_id: TableId::from(table),
            table_name: format!("Mesa {}", table),
            seat_index: seat,
        }
    }

    #[test]
    fn test_sync_source_wire_names() {
        assert_eq!(serde_json::to_string(&SyncSource::AutoSync).unwrap(), "\"auto-sync\"");
        assert_eq!(serde_json::to_string(&SyncSource::Guests).unwrap(), "\"guests\"");
        let parsed: SyncSource = serde_json::from_str("\"seating\"").unwrap();
        assert_eq!(parsed, SyncSource::Seating);
    }

    #[test]
    fn test_patch_sets_mirrors() {
        let patch = GuestPatch::seating(Some(assignment("4", 2)), SyncSource::Seating);
        assert_eq!(patch.table_id, Some(TableId::from("4")));
        assert_eq!(patch.table.as_deref(), Some("Mesa 4"));

        let mut guest = Guest::new("g1", "Ana");
        guest.apply(&patch);
        assert!(!guest.diverges_from(Some(&assignment("4", 2))));
        assert_eq!(guest.last_synced_from, Some(SyncSource::Seating));
    }

    #[test]
    fn test_stale_mirror_counts_as_divergence() {
        let mut guest = Guest::new("g1", "Ana");
        guest.apply(&GuestPatch::seating(Some(assignment("1", 0)), SyncSource::Guests));
        guest.table = Some("Old name".into());
        assert!(guest.diverges_from(Some(&assignment("1", 0))));
    }

    #[test]
    fn test_unseated_guest_matches_none() {
        let guest = Guest::new("g1", "Ana");
        assert!(!guest.diverges_from(None));
        assert!(guest.diverges_from(Some(&assignment("1", 0))));
    }

    #[test]
    fn test_guest_document_is_camel_case() {
        let mut guest = Guest::new("g1", "Ana");
        guest.apply(&GuestPatch::seating(Some(assignment("2", 1)), SyncSource::Seating));
        let json = serde_json::to_value(&guest).unwrap();
        assert_eq!(json["seatAssignment"]["tableId"], "2");
        assert_eq!(json["seatAssignment"]["seatIndex"], 1);
        assert_eq!(json["lastSyncedFrom"], "seating");
        assert_eq!(json["table"], "Mesa 2");
    }

    #[test]
    fn test_merge_keeps_stored_hall() {
        let mut stored = SeatingPlan {
            hall: Some(HallConfig {
                width: 2000.0,
                height: 1600.0,
                aisle_min: Some(120.0),
            }),
            ..SeatingPlan::empty()
        };
        let mut incoming = SeatingPlan::empty();
        incoming.touch(SyncSource::Guests);
        stored.merge_from(incoming);
        assert_eq!(stored.hall.as_ref().map(|h| h.width), Some(2000.0));
        assert_eq!(stored.last_synced_from, Some(SyncSource::Guests));
    }
}
