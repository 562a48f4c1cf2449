//! Operator CLI for a seating store file.
//!
//! Every command prints one JSON document to stdout. Commands that change
//! either side finish with a reconciliation pass, so the file is consistent
//! when the process exits.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use seating_sync::layout::{catalog, ceremony_catalog, find_ceremony_template};
use seating_sync::{
    AssignCandidate, BanquetLayoutParams, Guest, GuestId, JsonFileStore, ManualScheduler,
    SeatGridParams, SeatingSync, SyncConfig, SyncReport, TableId, TopologyStore,
};

#[derive(Parser)]
#[command(name = "seating")]
#[command(about = "Seating plan and guest list synchronization")]
struct Cli {
    /// Store file (defaults to $SEATING_STORE_PATH, then seating.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add or replace a guest record
    AddGuest {
        id: String,
        name: String,
        #[arg(long)]
        party: Option<String>,
    },

    /// List guest records
    ListGuests,

    /// Replace the tables with a rectangular banquet grid
    Banquet {
        #[arg(long, default_value_t = 3)]
        rows: u32,
        #[arg(long, default_value_t = 4)]
        cols: u32,
        #[arg(long, default_value_t = 8)]
        seats: u32,
    },

    /// Replace the ceremony seats with a chair grid
    Grid {
        #[arg(long, default_value_t = 10)]
        rows: u32,
        #[arg(long, default_value_t = 12)]
        cols: u32,
        #[arg(long, default_value_t = 40.0)]
        gap: f64,
        #[arg(long, default_value_t = 6)]
        aisle_after: u32,
    },

    /// Replace the tables (or, for `theater`, the ceremony seats) with a
    /// built-in template
    Template {
        id: String,
        /// Guest count to size for (defaults to the number of guest records)
        #[arg(long)]
        guests: Option<usize>,
    },

    /// List built-in templates
    Templates,

    /// Move a guest to a table in the plan (no table: unseat)
    Seat {
        guest: String,
        #[arg(long)]
        table: Option<String>,
    },

    /// Rank tables with room for a guest, party tables first
    Suggest { guest: String },

    /// Copy a guest's seat from the plan onto the guest record
    SeatFromPlan { guest: String },

    /// Seat every unseated guest in free seats
    AutoAssign,

    /// Run one reconciliation pass
    Sync,

    /// Report divergences without changing anything
    Conflicts,

    /// Print the seating plan
    Show,

    /// Remove every table
    Clear,
}

#[derive(Serialize)]
struct Response<T: Serialize> {
    success: bool,
    result: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    sync: Option<SyncReport>,
}

fn output<T: Serialize>(result: T, sync: Option<SyncReport>) -> Result<()> {
    let resp = Response {
        success: true,
        result,
        sync,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&resp).context("Failed to encode response")?
    );
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let config = SyncConfig::from_env()?;
    let path = cli
        .store
        .or_else(|| env::var_os("SEATING_STORE_PATH").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("seating.json"));
    tracing::debug!(path = %path.display(), "using store file");

    let store = Arc::new(JsonFileStore::new(path));
    // One-shot process: debounced passes never fire, writes reconcile explicitly.
    let engine = SeatingSync::builder(store.clone())
        .with_config(config)
        .with_scheduler(Arc::new(ManualScheduler::new()))
        .build();

    match cli.command {
        Commands::AddGuest { id, name, party } => {
            let mut guest = Guest::new(id, name);
            guest.party = party;
            store
                .upsert_guest(guest.clone())
                .await
                .context("Failed to write guest")?;
            output(guest, None)
        }
        Commands::ListGuests => output(store.list_guests().await?, None),
        Commands::Banquet { rows, cols, seats } => {
            let params = BanquetLayoutParams::builder()
                .rows(rows)
                .cols(cols)
                .seats_per_table(seats)
                .build();
            let topology = engine.generate_banquet_layout(&params).await?;
            output(topology, Some(engine.sync_all().await?))
        }
        Commands::Grid {
            rows,
            cols,
            gap,
            aisle_after,
        } => {
            let params = SeatGridParams::builder()
                .rows(rows)
                .cols(cols)
                .gap(gap)
                .aisle_after(aisle_after)
                .build();
            output(engine.generate_seat_grid(&params).await?, None)
        }
        Commands::Template { id, guests } => {
            let count = match guests {
                Some(count) => count,
                None => store.list_guests().await?.len(),
            };
            if find_ceremony_template(&id).is_ok() {
                return output(engine.apply_ceremony_template(&id, count).await?, None);
            }
            let topology = engine.apply_template(&id, count).await?;
            output(topology, Some(engine.sync_all().await?))
        }
        Commands::Templates => output(
            json!({ "banquet": catalog(), "ceremony": ceremony_catalog() }),
            None,
        ),
        Commands::Suggest { guest } => output(
            engine
                .suggest_tables_for_guest(&GuestId::from(guest))
                .await?,
            None,
        ),
        Commands::Seat { guest, table } => {
            let table = table.map(TableId::from);
            let taken = engine
                .sync_guest_to_seating(&GuestId::from(guest), table.as_ref())
                .await?;
            output(taken, Some(engine.sync_all().await?))
        }
        Commands::SeatFromPlan { guest } => {
            let guest = GuestId::from(guest);
            let assignment = store
                .get_seating_plan()
                .await?
                .and_then(|plan| {
                    let seat = plan.topology.locate(&guest)?;
                    plan.topology.assignment_at(seat)
                });
            engine
                .sync_seating_to_guest(&guest, assignment.clone())
                .await?;
            output(assignment, None)
        }
        Commands::AutoAssign => {
            let candidates: Vec<AssignCandidate> = store
                .list_guests()
                .await?
                .iter()
                .filter(|g| g.seat_assignment.is_none())
                .map(AssignCandidate::from)
                .collect();
            let outcome = engine.auto_assign(&candidates).await?;
            let placed: Vec<&GuestId> = outcome.assignments.iter().map(|(g, _)| g).collect();
            output(
                json!({
                    "placed": placed,
                    "unassigned": outcome.unassigned,
                    "skipped": outcome.skipped,
                }),
                Some(engine.sync_all().await?),
            )
        }
        Commands::Sync => output(engine.sync_all().await?, None),
        Commands::Conflicts => output(engine.detect_conflicts().await?, None),
        Commands::Show => output(store.get_seating_plan().await?, None),
        Commands::Clear => {
            engine.clear_layout().await?;
            output(json!({ "cleared": true }), Some(engine.sync_all().await?))
        }
    }
}
