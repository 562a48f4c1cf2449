//! Layout generators.
//!
//! Everything here is a pure function of its parameters: the same input
//! always produces the same seats and tables, including the scattered
//! template arrangement, which draws from a fixed-seed generator.

mod grid;
pub mod template;

pub use grid::{banquet_layout, seat_grid, BanquetLayoutParams, SeatGridParams, MAX_GRID_CELLS};
pub use template::{
    apply_ceremony_template, apply_template, catalog, ceremony_catalog, find_ceremony_template,
    find_template, Arrangement, CeremonyTemplate, SeatingTemplate,
};

use crate::model::TableId;
use crate::topology::{TableDraft, TableShape};

/// Draft for the `number`-th generated table (1-based): id `"{n}"`, name
/// `"Mesa {n}"`, centered at `(x, y)`.
pub(crate) fn numbered_table(
    number: usize,
    shape: TableShape,
    capacity: u32,
    x: f64,
    y: f64,
) -> TableDraft {
    let (width, height) = shape.footprint(capacity);
    TableDraft {
        id: TableId::new(number.to_string()),
        name: format!("Mesa {}", number),
        shape,
        width,
        height,
        x,
        y,
        capacity,
    }
}
