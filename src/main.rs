use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ulid::Ulid;

use rentavail::clock::SystemClock;
use rentavail::config::Config;
use rentavail::engine::AvailabilityEngine;
use rentavail::limits::{DEFAULT_FREE_RANGE_DAYS, DEFAULT_MAX_RESULTS};
use rentavail::model::{
    AvailabilityQuery, Cents, DateInterval, ManualBlock, Ms, Reservation, add_days, format_day,
    parse_day,
};
use rentavail::notify::NotifyHub;
use rentavail::reaper;
use rentavail::service::AvailabilityService;
use rentavail::store::ReservationStore;

/// Car availability and alternative-date suggestions over a local
/// reservation log.
#[derive(Debug, Parser)]
#[command(name = "rentavail", version)]
struct Cli {
    /// Overrides RENTAVAIL_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Commit reservations and owner blocks from a JSON file.
    Import { file: PathBuf },
    /// Check a date range and suggest alternatives if it is taken.
    Check {
        #[arg(long)]
        resource: Ulid,
        #[arg(long, value_parser = day_arg)]
        from: Ms,
        #[arg(long, value_parser = day_arg)]
        to: Ms,
        /// Daily price in cents, used to price suggestions.
        #[arg(long)]
        price: Option<Cents>,
    },
    /// Booked and owner-blocked ranges, tagged with their source.
    Blocked {
        #[arg(long)]
        resource: Ulid,
        #[arg(long, value_parser = day_arg)]
        from: Ms,
        #[arg(long, value_parser = day_arg)]
        to: Option<Ms>,
    },
    /// Free gaps and the next free day.
    Free {
        #[arg(long)]
        resource: Ulid,
        #[arg(long, value_parser = day_arg)]
        from: Ms,
        #[arg(long, value_parser = day_arg)]
        to: Option<Ms>,
        #[arg(long, default_value_t = DEFAULT_MAX_RESULTS)]
        max: usize,
    },
    /// Run pending-reservation expiry, WAL compaction and the metrics
    /// endpoint until interrupted.
    Serve,
}

fn day_arg(s: &str) -> Result<Ms, String> {
    parse_day(s).map_err(|e| e.to_string())
}

#[derive(Debug, Default, Deserialize)]
struct ImportFile {
    #[serde(default)]
    reservations: Vec<Reservation>,
    #[serde(default)]
    blocks: Vec<ManualBlock>,
}

#[derive(Debug, Default, Serialize)]
struct ImportSummary {
    committed: usize,
    blocks_added: usize,
    rejected: Vec<Rejected>,
}

#[derive(Debug, Serialize)]
struct Rejected {
    id: Ulid,
    error: String,
}

#[derive(Debug, Serialize)]
struct FreeReport {
    ranges: Vec<DateInterval>,
    next_available_date: Option<String>,
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    std::fs::create_dir_all(&config.data_dir)?;

    let notify = Arc::new(NotifyHub::new());
    let store = Arc::new(ReservationStore::open(config.wal_path(), notify)?);
    let engine = AvailabilityEngine::new(Arc::new(SystemClock));
    let service = AvailabilityService::new(store.clone(), engine, config.search_options());

    match cli.command {
        Command::Import { file } => {
            let parsed: ImportFile = serde_json::from_slice(&std::fs::read(&file)?)?;
            let mut summary = ImportSummary::default();
            for reservation in parsed.reservations {
                let id = reservation.id;
                match store.commit_reservation(reservation).await {
                    Ok(()) => summary.committed += 1,
                    Err(e) => summary.rejected.push(Rejected {
                        id,
                        error: e.to_string(),
                    }),
                }
            }
            for block in parsed.blocks {
                let id = block.id;
                match store.add_manual_block(block).await {
                    Ok(()) => summary.blocks_added += 1,
                    Err(e) => summary.rejected.push(Rejected {
                        id,
                        error: e.to_string(),
                    }),
                }
            }
            info!(
                file = %file.display(),
                committed = summary.committed,
                blocks = summary.blocks_added,
                rejected = summary.rejected.len(),
                "import finished"
            );
            print_json(&summary)?;
        }
        Command::Check {
            resource,
            from,
            to,
            price,
        } => {
            let query = AvailabilityQuery::from_bounds(resource, from, to)?;
            print_json(&service.check(&query, price).await?)?;
        }
        Command::Blocked { resource, from, to } => {
            print_json(&service.blocked_ranges(resource, from, to).await?)?;
        }
        Command::Free {
            resource,
            from,
            to,
            max,
        } => {
            let until = to.unwrap_or_else(|| add_days(from, DEFAULT_FREE_RANGE_DAYS));
            let ranges = service.next_available_range(resource, from, until, max).await?;
            let next = service.next_available_date(resource, from).await?;
            print_json(&FreeReport {
                ranges,
                next_available_date: next.map(format_day),
            })?;
        }
        Command::Serve => serve(store, &config).await?,
    }
    Ok(())
}

async fn serve(store: Arc<ReservationStore>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    rentavail::observability::init(config.metrics_port)?;

    info!("rentavail serving");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  resources: {}", store.resource_count());
    info!("  reaper interval: {:?}", config.reaper_interval);
    info!("  compact threshold: {}", config.compact_threshold);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let reaper_task = tokio::spawn(reaper::run_reaper(
        store.clone(),
        Arc::new(SystemClock),
        config.reaper_interval,
    ));
    let compactor_task = tokio::spawn(reaper::run_compactor(store.clone(), config.compact_threshold));

    // Graceful shutdown on SIGTERM/ctrl-c
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    info!("shutdown signal received");
    reaper_task.abort();
    compactor_task.abort();

    match store.compact().await {
        Ok(events) => info!(events, "final compaction done"),
        Err(e) => warn!("final compaction failed: {e}"),
    }
    info!("rentavail stopped");
    Ok(())
}
