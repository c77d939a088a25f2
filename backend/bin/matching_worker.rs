use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use ridepool::constants::{EXPIRY_SWEEP_INTERVAL_SECS, MATCHING_INTERVAL_SECS};
use ridepool::lifecycle::cleanup_expired_proposals;
use ridepool::matching::{run_matching_batch, MatchingConfig};
use ridepool::services::notifier::{LogNotifier, Notifier, WebhookNotifier};
use ridepool::store::postgres::PgStore;
use ridepool::utils::{config::Config, init_logging};
use ridepool::{get_db_pool, DatabaseConfig};
use tokio::time;
use tracing::{error, info};

/// Runs the periodic matching tick and the proposal expiry sweep.
#[derive(Debug, Parser)]
struct Args {
    /// Seconds between matching runs
    #[arg(long, default_value_t = MATCHING_INTERVAL_SECS)]
    match_interval_secs: u64,

    /// Seconds between expiry sweeps
    #[arg(long, default_value_t = EXPIRY_SWEEP_INTERVAL_SECS)]
    sweep_interval_secs: u64,

    /// Run one matching batch and one sweep, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    info!("🚐 Starting Ridepool Matching Worker...");

    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;
    let store = PgStore::new(pool);

    let notifier: Box<dyn Notifier> = match &config.notify_webhook_url {
        Some(url) => Box::new(WebhookNotifier::new(url.clone())),
        None => Box::new(LogNotifier),
    };
    let matching = MatchingConfig::default();

    if args.once {
        run_matching_tick(&store, notifier.as_ref(), &matching).await;
        run_sweep_tick(&store).await;
        return Ok(());
    }

    let mut match_tick = time::interval(Duration::from_secs(args.match_interval_secs));
    let mut sweep_tick = time::interval(Duration::from_secs(args.sweep_interval_secs));

    loop {
        tokio::select! {
            _ = match_tick.tick() => {
                run_matching_tick(&store, notifier.as_ref(), &matching).await;
            }
            _ = sweep_tick.tick() => {
                run_sweep_tick(&store).await;
            }
        }
    }
}

async fn run_matching_tick(store: &PgStore, notifier: &dyn Notifier, matching: &MatchingConfig) {
    match run_matching_batch(store, notifier, matching).await {
        Ok(report) if report.trips_created > 0 => {
            info!(
                "📊 matching tick: {} groups | {} trips | {} proposals",
                report.groups_formed, report.trips_created, report.proposals_created
            );
        }
        Ok(_) => {}
        Err(e) => error!("❌ matching tick failed: {}", e),
    }
}

async fn run_sweep_tick(store: &PgStore) {
    match cleanup_expired_proposals(store, Utc::now()).await {
        Ok(0) => {}
        Ok(expired) => info!("🧹 expiry sweep cleaned up {} proposals", expired),
        Err(e) => error!("❌ expiry sweep failed: {}", e),
    }
}
