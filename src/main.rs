use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing_subscriber::EnvFilter;

use cottage_booking::adapters::rate_limiter::MemoryRateLimiter;
use cottage_booking::adapters::snapshot_store::SnapshotStore;
use cottage_booking::config::load_config;
use cottage_booking::domain::date_range::utc_offset;
use cottage_booking::mcp::server::CottageMcpServer;
use cottage_booking::ports::booking_store::BookingStore;
use cottage_booking::ports::rate_limiter::RateLimiter;

fn find_config_path() -> PathBuf {
    let candidates = [
        PathBuf::from("config.yaml"),
        binary_dir().join("config.yaml"),
    ];

    for path in &candidates {
        if path.exists() {
            return path.clone();
        }
    }

    candidates[0].clone()
}

fn binary_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout is reserved for MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting cottage-booking server");

    let config_path = find_config_path();
    let config = load_config(&config_path)?;

    let offset = utc_offset(config.booking.utc_offset_minutes)?;
    let snapshot_store = Arc::new(SnapshotStore::open(
        &config.store.snapshot_path,
        offset,
        config.pricing.reject_overlapping_seasons,
    )?);
    if let Some(secs) = config.store.reload_interval_secs.filter(|s| *s > 0) {
        snapshot_store.spawn_reload(Duration::from_secs(secs));
    }
    let store: Arc<dyn BookingStore> = snapshot_store;
    let limiter: Arc<dyn RateLimiter> = Arc::new(MemoryRateLimiter::from_config(&config.rate_limit));

    let server = CottageMcpServer::new(store, limiter, config.booking);

    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
