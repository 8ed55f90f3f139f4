//! End-to-end walkthrough: register drivers, book rides, run the matching
//! ticker, and complete a trip.
//!
//! ```sh
//! cargo run --example dispatch_run
//! ```

use std::sync::Arc;
use std::time::Duration;

use dispatch_core::config::EngineConfig;
use dispatch_core::engine::{BookRideRequest, DriverStatusUpdate, MatchEngine};
use dispatch_core::scheduler::spawn_ticker;
use dispatch_core::store::MemoryStore;
use dispatch_core::test_helpers::RecordingDispatcher;
use tracing::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let engine = Arc::new(
        MatchEngine::new(Arc::clone(&store), dispatcher.clone())
            .with_config(EngineConfig::default().with_tick_interval(Duration::from_millis(100))),
    );

    let (rider, driver) = store.transaction(|tx| {
        let rider = tx.insert_user("Asha");
        let driver = tx.insert_user("Ravi");
        Ok((rider, driver))
    })?;

    engine.register_driver(driver, "Ravi", Some("KA-01 Sedan".into()), None)?;
    engine.update_driver_status(
        driver,
        DriverStatusUpdate {
            status: "available".into(),
            lat: Some(12.9726),
            lng: Some(77.5950),
        },
    )?;

    let receipt = engine.book_ride(
        rider,
        BookRideRequest {
            pickup_lat: 12.9716,
            pickup_lng: 77.5946,
            pickup_address: "MG Road".into(),
            dropoff_lat: 12.9719,
            dropoff_lng: 77.6412,
            dropoff_address: "Indiranagar".into(),
            ride_class: Some("standard".into()),
        },
    )?;
    info!(
        ride = %receipt.ride_id,
        distance_km = receipt.distance_km,
        total = receipt.fare.total,
        eta = %receipt.eta.formatted,
        "ride booked"
    );

    let ticker = spawn_ticker(Arc::clone(&engine), engine.config().tick_interval);
    std::thread::sleep(Duration::from_millis(300));
    ticker.stop();

    engine.complete_ride(driver, receipt.ride_id)?;

    for (target, notification) in dispatcher.sent() {
        info!(target = %target, payload = %notification.to_payload(), "delivered");
    }
    Ok(())
}
