//! Shared engine fixture for integration tests.

use std::sync::Arc;

use dispatch_core::config::EngineConfig;
use dispatch_core::engine::{BookRideRequest, MatchEngine, RideReceipt};
use dispatch_core::engine::DriverStatusUpdate;
use dispatch_core::geo::Coordinate;
use dispatch_core::model::{
    Driver, Meetup, MeetupId, MeetupInvite, InviteId, NewRide, RideId, RideRequest, UserId,
};
use dispatch_core::notify::{Notification, NotificationDispatcher, NotifyTarget};
use dispatch_core::pricing::RideClass;
use dispatch_core::store::MemoryStore;
use dispatch_core::test_helpers::RecordingDispatcher;

pub const MG_ROAD: Coordinate = Coordinate::new(12.9716, 77.5946);
pub const INDIRANAGAR: Coordinate = Coordinate::new(12.9719, 77.6412);
pub const KORAMANGALA: Coordinate = Coordinate::new(12.9352, 77.6245);
/// Roughly 28 km out, beyond the default 10 km search radius.
pub const AIRPORT: Coordinate = Coordinate::new(13.1986, 77.7066);

pub struct EngineFixture {
    pub store: Arc<MemoryStore>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub engine: Arc<MatchEngine>,
}

impl EngineFixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let engine = Arc::new(
            MatchEngine::new(
                Arc::clone(&store),
                Arc::clone(&dispatcher) as Arc<dyn NotificationDispatcher>,
            )
            .with_config(config),
        );
        Self {
            store,
            dispatcher,
            engine,
        }
    }

    pub fn add_user(&self, name: &str) -> UserId {
        self.store
            .transaction(|tx| Ok(tx.insert_user(name)))
            .expect("insert user")
    }

    /// Registers a driver, puts them at `location`, and marks them Available.
    pub fn add_available_driver(&self, name: &str, location: Coordinate) -> UserId {
        let user = self.add_user(name);
        self.engine
            .register_driver(user, name, Some("KA-01 Sedan".into()), None)
            .expect("register driver");
        self.engine
            .update_driver_status(
                user,
                DriverStatusUpdate {
                    status: "available".into(),
                    lat: Some(location.lat),
                    lng: Some(location.lng),
                },
            )
            .expect("driver available");
        user
    }

    pub fn book(&self, rider: UserId, pickup: Coordinate, dropoff: Coordinate) -> RideReceipt {
        self.engine
            .book_ride(
                rider,
                BookRideRequest {
                    pickup_lat: pickup.lat,
                    pickup_lng: pickup.lng,
                    pickup_address: "Pickup".into(),
                    dropoff_lat: dropoff.lat,
                    dropoff_lng: dropoff.lng,
                    dropoff_address: "Dropoff".into(),
                    ride_class: None,
                },
            )
            .expect("book ride")
    }

    /// Inserts an address-only ride directly, bypassing coordinate pricing.
    pub fn book_address_only(&self, rider: UserId, pickup_address: &str) -> RideId {
        self.store
            .transaction(|tx| {
                let rider_name = tx.display_name(rider);
                Ok(tx.insert_ride(NewRide {
                    rider,
                    rider_name,
                    pickup: None,
                    pickup_address: pickup_address.into(),
                    dropoff: None,
                    dropoff_address: "Somewhere".into(),
                    distance_km: None,
                    fare: None,
                    ride_class: RideClass::Standard,
                }))
            })
            .expect("insert ride")
    }

    pub fn ride(&self, id: RideId) -> RideRequest {
        self.store
            .read(|tx| tx.ride(id).cloned())
            .expect("read store")
            .expect("ride exists")
    }

    pub fn driver(&self, id: UserId) -> Driver {
        self.store
            .read(|tx| tx.driver(id).cloned())
            .expect("read store")
            .expect("driver exists")
    }

    pub fn meetup(&self, id: MeetupId) -> Meetup {
        self.store
            .read(|tx| tx.meetup(id).cloned())
            .expect("read store")
            .expect("meetup exists")
    }

    pub fn invite(&self, id: InviteId) -> MeetupInvite {
        self.store
            .read(|tx| tx.invite(id).cloned())
            .expect("read store")
            .expect("invite exists")
    }

    /// Notifications sent to `target`, in order.
    pub fn sent_to(&self, target: NotifyTarget) -> Vec<Notification> {
        self.dispatcher
            .sent()
            .into_iter()
            .filter(|(t, _)| *t == target)
            .map(|(_, n)| n)
            .collect()
    }
}
