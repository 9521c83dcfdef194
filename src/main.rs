//! HelmLink - Smart Helmet Ride Telemetry Core
//!
//! Headless runner: connects to the first matching helmet, starts a ride,
//! and streams telemetry until interrupted.

use directories::ProjectDirs;
use helmlink::app::HelmetApp;
use helmlink::clock::SystemClock;
use helmlink::link::ble::BleTransport;
use helmlink::link::types::AlwaysReady;
use helmlink::storage::config::AppConfig;
use helmlink::storage::database::Database;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Reconnection attempts before giving up and running without a link.
const MAX_CONNECT_ATTEMPTS: u32 = 3;

/// Delay between reconnection attempts.
const CONNECT_RETRY_DELAY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting HelmLink v{}", env!("CARGO_PKG_VERSION"));

    let dirs = ProjectDirs::from("", "ProvidenceIT", "helmlink");
    let config_path = dirs
        .as_ref()
        .map(|d| d.config_dir().join("helmlink.toml"))
        .unwrap_or_else(|| PathBuf::from("helmlink.toml"));
    let config = AppConfig::load_or_default(&config_path);

    let db_path = dirs
        .as_ref()
        .map(|d| d.data_dir().join("rides.db"))
        .unwrap_or_else(|| PathBuf::from("rides.db"));
    let database = Arc::new(Database::open(&db_path)?);

    let transport = BleTransport::initialize().await?;
    let app = HelmetApp::new(
        transport.clone(),
        Arc::new(AlwaysReady),
        database,
        Arc::new(SystemClock),
        &config,
    );
    transport.spawn_adapter_watch(app.link().clone());

    for attempt in 1..=MAX_CONNECT_ATTEMPTS {
        match app.reconnect().await {
            Ok(()) => break,
            Err(e) => {
                tracing::warn!(attempt, error = %e, "helmet connection failed");
                if attempt < MAX_CONNECT_ATTEMPTS {
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
            }
        }
    }
    if !app.link().is_connected() {
        tracing::warn!("running without a helmet link; telemetry will not flow");
    }

    app.on_foreground();
    app.start_ride()?;
    tracing::info!("Ride started, press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    match app.stop_ride() {
        Ok(profile) => tracing::info!(
            distance_km = profile.distance_km,
            duration = %profile.duration_formatted(),
            avg_speed_kmh = profile.avg_speed_kmh,
            "Ride saved"
        ),
        Err(e) => tracing::warn!(error = %e, "failed to stop ride"),
    }
    app.shutdown().await;

    Ok(())
}
