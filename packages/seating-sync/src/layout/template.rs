//! Template-driven banquet layouts.
//!
//! A template fixes the table shape, the seats per table and how tables are
//! arranged in the hall. Applying it to a guest count yields
//! `ceil(guests / seats_per_table)` empty tables positioned by the
//! arrangement.

use std::f64::consts::PI;

use serde::Serialize;
use tracing::warn;

use super::{numbered_table, seat_grid, SeatGridParams};
use crate::error::{Result, SeatingError};
use crate::model::{CeremonySeat, HallConfig};
use crate::topology::{TableShape, Topology};

const MARGIN_X: f64 = 120.0;
const MARGIN_Y: f64 = 160.0;
const CHEVRON_OFFSET: f64 = 80.0;
const SCATTER_SEED: u64 = 0x5EA7_1A60;
const SCATTER_ATTEMPTS: usize = 200;

/// How tables are placed in the hall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Arrangement {
    /// Near-square grid, centered.
    Grid,
    /// Grid rows alternately shifted left and right (herringbone).
    Diagonal,
    /// Top row, right column, then bottom row right to left.
    Horseshoe,
    /// Ring around the hall center.
    Clusters,
    /// Random positions with a minimum distance, from a fixed seed.
    Scattered,
    /// Long tables stacked in one column.
    Rows,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatingTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub min_guests: usize,
    pub max_guests: usize,
    pub shape: TableShape,
    pub seats_per_table: u32,
    /// Clear space kept between neighbouring tables.
    pub spacing: f64,
    pub arrangement: Arrangement,
}

static CATALOG: [SeatingTemplate; 7] = [
    SeatingTemplate {
        id: "classic",
        name: "Classic banquet",
        min_guests: 60,
        max_guests: 200,
        shape: TableShape::Circle,
        seats_per_table: 10,
        spacing: 150.0,
        arrangement: Arrangement::Grid,
    },
    SeatingTemplate {
        id: "intimate",
        name: "Intimate dinner",
        min_guests: 10,
        max_guests: 60,
        shape: TableShape::Circle,
        seats_per_table: 8,
        spacing: 100.0,
        arrangement: Arrangement::Clusters,
    },
    SeatingTemplate {
        id: "imperial",
        name: "Imperial table",
        min_guests: 20,
        max_guests: 100,
        shape: TableShape::Rectangle,
        seats_per_table: 20,
        spacing: 120.0,
        arrangement: Arrangement::Rows,
    },
    SeatingTemplate {
        id: "u_shape",
        name: "U-shape",
        min_guests: 40,
        max_guests: 120,
        shape: TableShape::Circle,
        seats_per_table: 10,
        spacing: 120.0,
        arrangement: Arrangement::Horseshoe,
    },
    SeatingTemplate {
        id: "chevron",
        name: "Chevron",
        min_guests: 60,
        max_guests: 160,
        shape: TableShape::Circle,
        seats_per_table: 10,
        spacing: 100.0,
        arrangement: Arrangement::Diagonal,
    },
    SeatingTemplate {
        id: "garden",
        name: "Garden party",
        min_guests: 80,
        max_guests: 200,
        shape: TableShape::Hexagon,
        seats_per_table: 10,
        spacing: 80.0,
        arrangement: Arrangement::Scattered,
    },
    SeatingTemplate {
        id: "cocktail",
        name: "Cocktail",
        min_guests: 40,
        max_guests: 120,
        shape: TableShape::Circle,
        seats_per_table: 6,
        spacing: 100.0,
        arrangement: Arrangement::Clusters,
    },
];

/// Every built-in template.
pub fn catalog() -> &'static [SeatingTemplate] {
    &CATALOG
}

pub fn find_template(id: &str) -> Result<&'static SeatingTemplate> {
    CATALOG
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| SeatingError::UnknownTemplate(id.to_string()))
}

impl SeatingTemplate {
    pub fn fits(&self, guest_count: usize) -> bool {
        (self.min_guests..=self.max_guests).contains(&guest_count)
    }

    pub fn tables_needed(&self, guest_count: usize) -> usize {
        guest_count.div_ceil(self.seats_per_table.max(1) as usize)
    }
}

/// Lay out `template` for `guest_count` guests in the default hall.
pub fn apply_template(template: &SeatingTemplate, guest_count: usize) -> Topology {
    apply_template_in(template, guest_count, &HallConfig::default())
}

/// Lay out `template` for `guest_count` guests in `hall`.
pub fn apply_template_in(
    template: &SeatingTemplate,
    guest_count: usize,
    hall: &HallConfig,
) -> Topology {
    if !template.fits(guest_count) {
        warn!(
            template = template.id,
            guests = guest_count,
            min = template.min_guests,
            max = template.max_guests,
            "guest count outside template range"
        );
    }

    let count = template.tables_needed(guest_count);
    let footprint = template.shape.footprint(template.seats_per_table);
    let positions = positions(template.arrangement, count, footprint, template.spacing, hall);

    let mut topology = Topology::new();
    for (i, (x, y)) in positions.into_iter().enumerate() {
        topology.append_table(numbered_table(
            i + 1,
            template.shape,
            template.seats_per_table,
            x,
            y,
        ));
    }
    topology
}

// =============================================================================
// Ceremony templates
// =============================================================================

/// Rows of chairs facing the front, split by a center aisle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CeremonyTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub min_guests: usize,
    pub max_guests: usize,
    pub seats_per_row: u32,
    pub seat_spacing: f64,
    pub row_spacing: f64,
    pub aisle_width: f64,
}

static CEREMONY_CATALOG: [CeremonyTemplate; 1] = [CeremonyTemplate {
    id: "theater",
    name: "Theater",
    min_guests: 100,
    max_guests: 200,
    seats_per_row: 15,
    seat_spacing: 30.0,
    row_spacing: 50.0,
    aisle_width: 100.0,
}];

pub fn ceremony_catalog() -> &'static [CeremonyTemplate] {
    &CEREMONY_CATALOG
}

pub fn find_ceremony_template(id: &str) -> Result<&'static CeremonyTemplate> {
    CEREMONY_CATALOG
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| SeatingError::UnknownTemplate(id.to_string()))
}

impl CeremonyTemplate {
    pub fn fits(&self, guest_count: usize) -> bool {
        (self.min_guests..=self.max_guests).contains(&guest_count)
    }

    /// Grid parameters seating `guest_count` guests in full rows.
    pub fn grid_params(&self, guest_count: usize) -> SeatGridParams {
        let per_row = self.seats_per_row.max(1);
        let rows = guest_count.div_ceil(per_row as usize);
        SeatGridParams::builder()
            .rows(u32::try_from(rows).unwrap_or(u32::MAX))
            .cols(per_row)
            .gap(self.seat_spacing)
            .row_gap(self.row_spacing)
            .aisle_after((per_row / 2).saturating_sub(1))
            .aisle_width(self.aisle_width)
            .start_y(MARGIN_Y - 60.0)
            .build()
    }
}

/// Ceremony seats for `guest_count` guests. Oversized counts fail like any
/// oversized grid.
pub fn apply_ceremony_template(
    template: &CeremonyTemplate,
    guest_count: usize,
) -> Result<Vec<CeremonySeat>> {
    if !template.fits(guest_count) {
        warn!(
            template = template.id,
            guests = guest_count,
            min = template.min_guests,
            max = template.max_guests,
            "guest count outside template range"
        );
    }
    seat_grid(&template.grid_params(guest_count))
}

fn grid_dimensions(count: usize) -> (usize, usize) {
    if count == 0 {
        return (0, 0);
    }
    let cols = (count as f64).sqrt().ceil() as usize;
    (count.div_ceil(cols), cols)
}

fn positions(
    arrangement: Arrangement,
    count: usize,
    (width, height): (f64, f64),
    spacing: f64,
    hall: &HallConfig,
) -> Vec<(f64, f64)> {
    if count == 0 {
        return Vec::new();
    }
    let span = width.max(height);
    match arrangement {
        Arrangement::Grid => {
            let (rows, cols) = grid_dimensions(count);
            let total_w = cols as f64 * width + (cols - 1) as f64 * spacing;
            let total_h = rows as f64 * height + (rows - 1) as f64 * spacing;
            let start_x = MARGIN_X + ((hall.width - 2.0 * MARGIN_X - total_w) / 2.0).max(0.0);
            let start_y = MARGIN_Y + ((hall.height - 2.0 * MARGIN_Y - total_h) / 2.0).max(0.0);
            (0..count)
                .map(|i| {
                    let (row, col) = (i / cols, i % cols);
                    (
                        start_x + width / 2.0 + col as f64 * (width + spacing),
                        start_y + height / 2.0 + row as f64 * (height + spacing),
                    )
                })
                .collect()
        }
        Arrangement::Diagonal => {
            let (rows, _) = grid_dimensions(count);
            let per_row = count.div_ceil(rows);
            (0..count)
                .map(|i| {
                    let (row, col) = (i / per_row, i % per_row);
                    let offset = if row % 2 == 0 { CHEVRON_OFFSET } else { -CHEVRON_OFFSET };
                    (
                        MARGIN_X + width / 2.0 + col as f64 * (width + spacing) + offset,
                        MARGIN_Y + height / 2.0 + row as f64 * (height + spacing),
                    )
                })
                .collect()
        }
        Arrangement::Horseshoe => {
            let margin = MARGIN_X;
            let per_side = count.div_ceil(3);
            let right_count = (count - per_side).div_ceil(2);
            let step_x = ((hall.width - 2.0 * margin - span) / per_side as f64).max(span + spacing);
            let step_y = ((hall.height - 2.0 * margin - span) / (right_count + 1) as f64).max(span);
            let left = margin + span / 2.0;
            let right = hall.width - margin - span / 2.0;
            let top = margin + span / 2.0;
            let bottom = hall.height - margin - span / 2.0;

            let mut out = Vec::with_capacity(count);
            out.extend((0..per_side).map(|i| (left + i as f64 * step_x, top)));
            out.extend((0..right_count).map(|i| (right, top + (i + 1) as f64 * step_y)));
            let bottom_count = count - out.len();
            out.extend((0..bottom_count).map(|i| (right - i as f64 * step_x, bottom)));
            out
        }
        Arrangement::Clusters => {
            let (cx, cy) = (hall.width / 2.0, hall.height / 2.0);
            let circumference = count as f64 * (span + spacing);
            let radius = (circumference / (2.0 * PI)).min(hall.width.min(hall.height) * 0.4);
            let step = 2.0 * PI / count as f64;
            (0..count)
                .map(|i| {
                    let angle = i as f64 * step - PI / 2.0;
                    (cx + radius * angle.cos(), cy + radius * angle.sin())
                })
                .collect()
        }
        Arrangement::Scattered => scattered(count, span, spacing, hall),
        Arrangement::Rows => (0..count)
            .map(|i| {
                (
                    hall.width / 2.0,
                    MARGIN_Y + height / 2.0 + i as f64 * (height + spacing),
                )
            })
            .collect(),
    }
}

fn scattered(count: usize, span: f64, spacing: f64, hall: &HallConfig) -> Vec<(f64, f64)> {
    let mut rng = fastrand::Rng::with_seed(SCATTER_SEED);
    let min_distance = span + spacing;
    let usable_w = hall.width - 2.0 * MARGIN_X - span;
    let usable_h = hall.height - 2.0 * MARGIN_X - span;
    let (_, fallback_cols) = grid_dimensions(count);

    let mut out: Vec<(f64, f64)> = Vec::with_capacity(count);
    for _ in 0..count {
        let mut placed = None;
        for _ in 0..SCATTER_ATTEMPTS {
            let x = MARGIN_X + span / 2.0 + rng.f64() * usable_w;
            let y = MARGIN_X + span / 2.0 + rng.f64() * usable_h;
            let clear = out
                .iter()
                .all(|(px, py)| ((x - px).powi(2) + (y - py).powi(2)).sqrt() >= min_distance);
            if clear {
                placed = Some((x, y));
                break;
            }
        }
        let position = placed.unwrap_or_else(|| {
            let slot = out.len();
            let (row, col) = (slot / fallback_cols, slot % fallback_cols);
            (
                MARGIN_X + span / 2.0 + col as f64 * min_distance,
                MARGIN_X + span / 2.0 + row as f64 * min_distance,
            )
        });
        out.push(position);
    }
    out
}
