//! Integration tests for gotimed
//!
//! These drive the full stack: parsed configuration -> engine -> mock source.

use gotime_config::{WatchLocation, parse_config};
use gotime_core::{MonitoringEngine, MonitoringResult, SessionStatus, WatchParams};
use gotime_maps::{LatLng, MockSource};
use gotime_util::RateLimiter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const CONFIG: &str = r#"
    config_version = 1

    [service]
    polling_interval_seconds = 10
    default_timeout_minutes = 5
    max_concurrent_sessions = 4
    api_requests_per_minute = 100
    api_requests_per_day = 10000
    sweep_interval_seconds = 10

    [[watches]]
    label = "commute"
    origin = { lat = 37.77, lng = -122.41 }
    destination = { lat = 37.42, lng = -122.08 }
    target_seconds = 600

    [[watches]]
    label = "airport-run"
    origin = { lat = 37.77, lng = -122.41 }
    destination = { lat = 37.62, lng = -122.38 }
    target_seconds = 900
    timeout_minutes = 30
"#;

fn coords(location: &WatchLocation) -> LatLng {
    match location {
        WatchLocation::Coords(coords) => *coords,
        WatchLocation::Address(address) => panic!("expected coordinates, got '{}'", address),
    }
}

fn build_engine(
    source: Arc<MockSource>,
) -> (
    MonitoringEngine,
    gotime_config::Config,
    mpsc::UnboundedReceiver<MonitoringResult>,
) {
    let config = parse_config(CONFIG).unwrap();
    let limiter = Arc::new(RateLimiter::new(
        config.service.api_requests_per_minute,
        config.service.api_requests_per_day,
    ));
    let engine = MonitoringEngine::new(config.service.clone(), source, limiter);

    let (tx, rx) = mpsc::unbounded_channel();
    engine.set_notification_callback(move |result| {
        let _ = tx.send(result);
    });

    (engine, config, rx)
}

fn params_for(watch: &gotime_config::WatchConfig) -> WatchParams {
    WatchParams {
        origin: coords(&watch.origin),
        destination: coords(&watch.destination),
        target: watch.target,
        timeout: watch.timeout,
        poll_interval: watch.poll_interval,
        label: watch.label.clone(),
    }
}

#[tokio::test(start_paused = true)]
async fn configured_watch_runs_to_target() {
    let source = Arc::new(MockSource::new());
    source.push_travel_time(900);
    source.push_travel_time(550);

    let (engine, config, mut rx) = build_engine(source.clone());

    let session = engine.new_session(params_for(&config.watches[0]));
    engine.register(session).await.unwrap();

    let result = rx.recv().await.unwrap();
    assert_eq!(result.status, SessionStatus::TargetReached);
    assert_eq!(result.final_travel_time, Some(Duration::from_secs(550)));
    assert_eq!(result.label.as_deref(), Some("commute"));
    assert_eq!(source.call_count(), 2);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn shutdown_with_watches_in_flight() {
    let source = Arc::new(MockSource::new()); // no route, watches never finish

    let (engine, config, mut rx) = build_engine(source);

    for watch in &config.watches {
        let session = engine.new_session(params_for(watch));
        engine.register(session).await.unwrap();
    }
    assert_eq!(engine.active_sessions().await, 2);

    engine.shutdown().await;

    let mut labels = vec![
        rx.recv().await.unwrap(),
        rx.recv().await.unwrap(),
    ]
    .into_iter()
    .map(|result| {
        assert_eq!(result.status, SessionStatus::Cancelled);
        assert_eq!(result.message, "Engine shutdown");
        result.label.unwrap()
    })
    .collect::<Vec<_>>();
    labels.sort();
    assert_eq!(labels, ["airport-run", "commute"]);

    assert_eq!(engine.active_sessions().await, 0);
    assert!(rx.try_recv().is_err());
}
