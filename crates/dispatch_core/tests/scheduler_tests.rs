mod support;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dispatch_core::config::EngineConfig;
use dispatch_core::model::RideStatus;
use dispatch_core::scheduler::spawn_ticker;

use support::fixtures::{EngineFixture, INDIRANAGAR, MG_ROAD};

fn fast_fixture() -> EngineFixture {
    EngineFixture::with_config(
        EngineConfig::default().with_tick_interval(Duration::from_millis(10)),
    )
}

#[test]
fn ticker_assigns_pending_rides_in_the_background() {
    let fx = fast_fixture();
    let rider = fx.add_user("Asha");
    let driver = fx.add_available_driver("Ravi", MG_ROAD);
    let receipt = fx.book(rider, MG_ROAD, INDIRANAGAR);

    let handle = spawn_ticker(Arc::clone(&fx.engine), fx.engine.config().tick_interval);

    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let ride = fx.ride(receipt.ride_id);
        if ride.status == RideStatus::Assigned {
            assert_eq!(ride.assigned_driver, Some(driver));
            break;
        }
        assert!(Instant::now() < deadline, "ride was never assigned");
        std::thread::sleep(Duration::from_millis(5));
    }

    handle.stop();
}

#[test]
fn stop_joins_the_worker_and_halts_ticking() {
    let fx = fast_fixture();
    let rider = fx.add_user("Asha");

    let handle = spawn_ticker(Arc::clone(&fx.engine), fx.engine.config().tick_interval);
    std::thread::sleep(Duration::from_millis(50));
    handle.stop();

    // Work arriving after stop() is never picked up.
    fx.add_available_driver("Ravi", MG_ROAD);
    let receipt = fx.book(rider, MG_ROAD, INDIRANAGAR);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(fx.ride(receipt.ride_id).status, RideStatus::Pending);
}

#[test]
fn dropping_the_handle_also_stops_the_worker() {
    let fx = fast_fixture();
    let rider = fx.add_user("Asha");

    {
        let _handle = spawn_ticker(Arc::clone(&fx.engine), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(30));
    }

    fx.add_available_driver("Ravi", MG_ROAD);
    let receipt = fx.book(rider, MG_ROAD, INDIRANAGAR);
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(fx.ride(receipt.ride_id).status, RideStatus::Pending);
}
