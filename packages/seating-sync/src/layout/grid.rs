use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::numbered_table;
use crate::error::{Result, SeatingError};
use crate::model::CeremonySeat;
use crate::topology::{TableDraft, TableShape, Topology};

/// Ceremony grid parameters. Rows of chairs with a wider aisle gap after
/// column `aisle_after`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SeatGridParams {
    #[builder(default = 10)]
    pub rows: u32,
    #[builder(default = 12)]
    pub cols: u32,
    #[builder(default = 40.0)]
    pub gap: f64,
    #[builder(default = 100.0)]
    pub start_x: f64,
    #[builder(default = 80.0)]
    pub start_y: f64,
    #[builder(default = 6)]
    pub aisle_after: u32,
    /// Distance between rows. Defaults to `gap`.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub row_gap: Option<f64>,
    /// Extra offset of the columns past the aisle. Defaults to `gap`.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub aisle_width: Option<f64>,
}

impl Default for SeatGridParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Banquet grid parameters: `rows * cols` rectangular tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct BanquetLayoutParams {
    #[builder(default = 3)]
    pub rows: u32,
    #[builder(default = 4)]
    pub cols: u32,
    #[builder(default = 8)]
    pub seats_per_table: u32,
    #[builder(default = 140.0)]
    pub gap_x: f64,
    #[builder(default = 160.0)]
    pub gap_y: f64,
    #[builder(default = 120.0)]
    pub start_x: f64,
    #[builder(default = 160.0)]
    pub start_y: f64,
}

impl Default for BanquetLayoutParams {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Largest number of seats or tables a generated grid may hold.
pub const MAX_GRID_CELLS: usize = 10_000;

fn grid_cells(rows: u32, cols: u32) -> Result<usize> {
    let cells = (rows as usize).saturating_mul(cols as usize);
    if cells > MAX_GRID_CELLS {
        return Err(SeatingError::InvalidTopology(format!(
            "{}x{} grid exceeds {} cells",
            rows, cols, MAX_GRID_CELLS
        )));
    }
    Ok(cells)
}

/// Ceremony seats in row-major order, ids from 1, all enabled and empty.
pub fn seat_grid(params: &SeatGridParams) -> Result<Vec<CeremonySeat>> {
    let mut seats = Vec::with_capacity(grid_cells(params.rows, params.cols)?);
    let row_gap = params.row_gap.unwrap_or(params.gap);
    let aisle_width = params.aisle_width.unwrap_or(params.gap);
    let mut id = 1;
    for row in 0..params.rows {
        for col in 0..params.cols {
            let aisle = if col > params.aisle_after { aisle_width } else { 0.0 };
            seats.push(CeremonySeat {
                id,
                x: params.start_x + f64::from(col) * params.gap + aisle,
                y: params.start_y + f64::from(row) * row_gap,
                enabled: true,
                guest_id: None,
            });
            id += 1;
        }
    }
    Ok(seats)
}

/// Banquet tables in row-major order, ids `"1"..`, 80×60 rectangles.
pub fn banquet_layout(params: &BanquetLayoutParams) -> Result<Topology> {
    grid_cells(params.rows, params.cols)?;
    let mut topology = Topology::new();
    let mut number = 1;
    for row in 0..params.rows {
        for col in 0..params.cols {
            let draft = numbered_table(
                number,
                TableShape::Rectangle,
                params.seats_per_table,
                params.start_x + f64::from(col) * params.gap_x,
                params.start_y + f64::from(row) * params.gap_y,
            );
            topology.append_table(TableDraft {
                width: 80.0,
                height: 60.0,
                ..draft
            });
            number += 1;
        }
    }
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableId;

    #[test]
    fn test_default_seat_grid() {
        let seats = seat_grid(&SeatGridParams::default()).unwrap();
        assert_eq!(seats.len(), 120);
        assert_eq!(seats[0].id, 1);
        assert_eq!(seats[119].id, 120);
        assert!(seats.iter().all(|s| s.enabled && s.guest_id.is_none()));
    }

    #[test]
    fn test_aisle_shifts_columns_after_threshold() {
        let seats = seat_grid(&SeatGridParams::default()).unwrap();
        // Columns 0..=6 follow the plain pitch, column 7 jumps one extra gap.
        assert_eq!(seats[6].x, 100.0 + 6.0 * 40.0);
        assert_eq!(seats[7].x, 100.0 + 7.0 * 40.0 + 40.0);
        // Second row starts one gap lower.
        assert_eq!(seats[12].y, 80.0 + 40.0);
        assert_eq!(seats[12].x, 100.0);
    }

    #[test]
    fn test_seat_grid_builder_overrides() {
        let params = SeatGridParams::builder().rows(2).cols(3).gap(50.0).build();
        let seats = seat_grid(&params).unwrap();
        assert_eq!(seats.len(), 6);
        assert_eq!(seats[5].x, 100.0 + 2.0 * 50.0);
    }

    #[test]
    fn test_row_gap_and_aisle_width() {
        let params = SeatGridParams::builder()
            .rows(2)
            .cols(4)
            .gap(30.0)
            .aisle_after(1)
            .row_gap(50.0)
            .aisle_width(100.0)
            .build();
        let seats = seat_grid(&params).unwrap();
        assert_eq!(seats[1].x, 100.0 + 30.0);
        assert_eq!(seats[2].x, 100.0 + 2.0 * 30.0 + 100.0);
        assert_eq!(seats[4].y, 80.0 + 50.0);
    }

    #[test]
    fn test_default_banquet_layout() {
        let topology = banquet_layout(&BanquetLayoutParams::default()).unwrap();
        assert_eq!(topology.table_count(), 12);
        assert_eq!(topology.capacity(), 96);
        assert_eq!(topology.occupied_count(), 0);

        let (_, last) = topology.tables().last().unwrap();
        assert_eq!(last.id, TableId::from("12"));
        assert_eq!(last.name, "Mesa 12");
        assert_eq!(last.shape, TableShape::Rectangle);
        assert_eq!((last.width, last.height), (80.0, 60.0));
        assert_eq!((last.x, last.y), (120.0 + 3.0 * 140.0, 160.0 + 2.0 * 160.0));
    }

    #[test]
    fn test_empty_banquet_layout() {
        let params = BanquetLayoutParams::builder().rows(0).build();
        assert!(banquet_layout(&params).unwrap().is_empty());
    }

    #[test]
    fn test_oversized_grids_rejected() {
        let params = SeatGridParams::builder().rows(70_000).cols(70_000).build();
        assert!(matches!(seat_grid(&params), Err(SeatingError::InvalidTopology(_))));

        let params = BanquetLayoutParams::builder().rows(u32::MAX).cols(u32::MAX).build();
        assert!(matches!(banquet_layout(&params), Err(SeatingError::InvalidTopology(_))));

        let params = SeatGridParams::builder().rows(100).cols(100).build();
        assert_eq!(seat_grid(&params).unwrap().len(), MAX_GRID_CELLS);
    }
}
