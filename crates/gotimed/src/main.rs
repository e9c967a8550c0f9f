//! gotimed - the gotime monitoring service
//!
//! This is the main entry point for the gotimed service.
//! It wires together all the components:
//! - Configuration loading
//! - The Google Maps client
//! - The shared API rate limiter
//! - The monitoring engine
//! - Signal handling for graceful shutdown

use anyhow::{Context, Result, bail};
use clap::Parser;
use gotime_config::{WatchLocation, load_config};
use gotime_core::{MonitoringEngine, MonitoringResult, SessionStatus, WatchParams};
use gotime_maps::{Geocoder, GoogleMapsClient, LatLng, TravelTimeSource};
use gotime_util::RateLimiter;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// gotimed - travel-time monitoring service
#[derive(Parser, Debug)]
#[command(name = "gotimed")]
#[command(about = "Watches travel times and notifies when they drop to target", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "gotime.toml")]
    config: PathBuf,

    /// Google Maps API key (overrides the config file)
    #[arg(short = 'k', long, env = "GOOGLE_MAPS_API_KEY")]
    api_key: Option<String>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "gotimed starting");

    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    info!(
        config_path = %args.config.display(),
        watch_count = config.watches.len(),
        "Configuration loaded"
    );

    if config.watches.is_empty() {
        warn!("No watches configured, nothing to do");
        return Ok(());
    }

    let api_key = args
        .api_key
        .or_else(|| config.service.google_maps_api_key.clone())
        .context(
            "No Google Maps API key: set google_maps_api_key in the config \
             or GOOGLE_MAPS_API_KEY in the environment",
        )?;

    let client = Arc::new(GoogleMapsClient::new(api_key));
    let limiter = Arc::new(RateLimiter::new(
        config.service.api_requests_per_minute,
        config.service.api_requests_per_day,
    ));
    let engine = MonitoringEngine::new(
        config.service.clone(),
        client.clone() as Arc<dyn TravelTimeSource>,
        limiter.clone(),
    );

    // Completed watches arrive through the notification callback; the main
    // loop consumes them from a channel so it can also watch for signals.
    let (tx, mut rx) = mpsc::unbounded_channel::<MonitoringResult>();
    engine.set_notification_callback(move |result| {
        let _ = tx.send(result);
    });

    let mut registered = 0usize;
    for (index, watch) in config.watches.iter().enumerate() {
        let label = watch
            .label
            .clone()
            .unwrap_or_else(|| format!("watch-{}", index));

        let origin = match resolve_location(client.as_ref(), &limiter, &watch.origin).await {
            Ok(coords) => coords,
            Err(e) => {
                warn!(label = %label, error = %e, "Skipping watch: origin unresolved");
                continue;
            }
        };
        let destination =
            match resolve_location(client.as_ref(), &limiter, &watch.destination).await {
                Ok(coords) => coords,
                Err(e) => {
                    warn!(label = %label, error = %e, "Skipping watch: destination unresolved");
                    continue;
                }
            };

        let session = engine.new_session(WatchParams {
            origin,
            destination,
            target: watch.target,
            timeout: watch.timeout,
            poll_interval: watch.poll_interval,
            label: Some(label.clone()),
        });

        match engine.register(session).await {
            Ok(session_id) => {
                registered += 1;
                info!(session_id = %session_id, label = %label, "Watch registered");
            }
            Err(e) => warn!(label = %label, error = %e, "Failed to register watch"),
        }
    }

    if registered == 0 {
        engine.shutdown().await;
        bail!("No watches could be registered");
    }

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;

    info!(registered, "Service running");

    let mut completed = 0usize;
    while completed < registered {
        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully");
                break;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully");
                break;
            }
            result = rx.recv() => {
                match result {
                    Some(result) => {
                        completed += 1;
                        report(&result);
                    }
                    None => break,
                }
            }
        }
    }

    engine.shutdown().await;

    let usage = engine.api_usage();
    info!(
        minute_used = usage.minute_used,
        daily_used = usage.daily_used,
        "gotimed exiting"
    );
    Ok(())
}

/// Resolve a configured watch endpoint to coordinates, geocoding through the
/// shared API budget when it is an address.
async fn resolve_location(
    geocoder: &dyn Geocoder,
    limiter: &RateLimiter,
    location: &WatchLocation,
) -> Result<LatLng> {
    match location {
        WatchLocation::Coords(coords) => Ok(*coords),
        WatchLocation::Address(address) => {
            limiter.acquire().await;
            match geocoder
                .geocode(address)
                .await
                .with_context(|| format!("Geocoding failed for '{}'", address))?
            {
                Some(coords) => {
                    info!(address = %address, %coords, "Address resolved");
                    Ok(coords)
                }
                None => bail!("No geocoding results for '{}'", address),
            }
        }
    }
}

fn report(result: &MonitoringResult) {
    let label = result.label.as_deref().unwrap_or("watch");
    match result.status {
        SessionStatus::TargetReached => {
            info!(session_id = %result.session_id, label, message = %result.message, "Watch completed")
        }
        SessionStatus::TimedOut => {
            warn!(session_id = %result.session_id, label, message = %result.message, "Watch timed out")
        }
        SessionStatus::Error => {
            error!(session_id = %result.session_id, label, message = %result.message, "Watch failed")
        }
        _ => {
            info!(session_id = %result.session_id, label, message = %result.message, "Watch ended")
        }
    }
}
