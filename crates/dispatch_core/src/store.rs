//! In-memory relational store with all-or-nothing transactions.
//!
//! [`MemoryStore`] holds every table behind one mutex. A transaction clones
//! the tables into a [`StoreTx`], runs the caller's closure against the
//! staged copy, and swaps the copy in only when the closure returns `Ok`.
//! An `Err` discards the staged state, so partial writes never land.
//!
//! The single mutex serializes transactions, which also gives operations a
//! consistent snapshot to read from; accessors are written so callers touch
//! ride rows before driver rows.

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::error::EngineError;
use crate::geo::Coordinate;
use crate::model::{
    Driver, DriverStatus, InviteId, InviteStatus, Meetup, MeetupId, MeetupInvite, MeetupStatus,
    NewRide, RideId, RideRequest, RideStatus, User, UserId,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    drivers: BTreeMap<UserId, Driver>,
    rides: BTreeMap<RideId, RideRequest>,
    meetups: BTreeMap<MeetupId, Meetup>,
    invites: BTreeMap<InviteId, MeetupInvite>,
    next_user: i64,
    next_ride: i64,
    next_meetup: i64,
    next_invite: i64,
}

/// Staged view of the tables inside a transaction.
#[derive(Debug)]
pub struct StoreTx {
    tables: Tables,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a staged copy of the tables; commits on `Ok`.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&mut StoreTx) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| EngineError::Store("store lock poisoned".into()))?;
        let mut tx = StoreTx {
            tables: guard.clone(),
        };
        let value = f(&mut tx)?;
        *guard = tx.tables;
        Ok(value)
    }

    /// Read-only access to a consistent snapshot.
    pub fn read<T>(&self, f: impl FnOnce(&StoreTx) -> T) -> Result<T, EngineError> {
        let guard = self
            .inner
            .lock()
            .map_err(|_| EngineError::Store("store lock poisoned".into()))?;
        let tx = StoreTx {
            tables: guard.clone(),
        };
        Ok(f(&tx))
    }
}

impl StoreTx {
    // --- users ---

    pub fn insert_user(&mut self, name: impl Into<String>) -> UserId {
        self.tables.next_user += 1;
        let id = UserId(self.tables.next_user);
        self.tables.users.insert(
            id,
            User {
                id,
                name: name.into(),
            },
        );
        id
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.tables.users.get(&id)
    }

    /// Display name with a generic fallback for unknown ids.
    pub fn display_name(&self, id: UserId) -> String {
        self.tables
            .users
            .get(&id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| "User".to_string())
    }

    // --- drivers ---

    pub fn driver(&self, user: UserId) -> Option<&Driver> {
        self.tables.drivers.get(&user)
    }

    pub fn driver_mut(&mut self, user: UserId) -> Option<&mut Driver> {
        self.tables.drivers.get_mut(&user)
    }

    pub fn upsert_driver(&mut self, driver: Driver) {
        self.tables.drivers.insert(driver.user, driver);
    }

    /// All drivers currently Available, ascending by user id (insertion order).
    pub fn available_drivers(&self) -> Vec<Driver> {
        self.tables
            .drivers
            .values()
            .filter(|d| d.status == DriverStatus::Available)
            .cloned()
            .collect()
    }

    // --- rides ---

    pub fn insert_ride(&mut self, new: NewRide) -> RideId {
        self.tables.next_ride += 1;
        let id = RideId(self.tables.next_ride);
        self.tables.rides.insert(
            id,
            RideRequest {
                id,
                rider: new.rider,
                rider_name: new.rider_name,
                pickup: new.pickup,
                pickup_address: new.pickup_address,
                dropoff: new.dropoff,
                dropoff_address: new.dropoff_address,
                distance_km: new.distance_km,
                fare: new.fare,
                ride_class: new.ride_class,
                status: RideStatus::Pending,
                assigned_driver: None,
                driver_approach: None,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn ride(&self, id: RideId) -> Option<&RideRequest> {
        self.tables.rides.get(&id)
    }

    pub fn ride_mut(&mut self, id: RideId) -> Option<&mut RideRequest> {
        self.tables.rides.get_mut(&id)
    }

    /// The pending ride waiting longest, ties broken by lower id.
    pub fn oldest_pending_ride(&self) -> Option<RideRequest> {
        self.tables
            .rides
            .values()
            .filter(|r| r.status == RideStatus::Pending)
            .min_by_key(|r| (r.created_at, r.id))
            .cloned()
    }

    /// Non-terminal rides headed to `destination` whose rider is in `riders`.
    pub fn active_rides_to(&self, destination: Coordinate, riders: &[UserId]) -> Vec<RideRequest> {
        self.tables
            .rides
            .values()
            .filter(|r| {
                matches!(r.status, RideStatus::Pending | RideStatus::Assigned)
                    && r.dropoff == Some(destination)
                    && riders.contains(&r.rider)
            })
            .cloned()
            .collect()
    }

    pub fn has_completed_ride_to(&self, rider: UserId, destination: Coordinate) -> bool {
        self.tables.rides.values().any(|r| {
            r.rider == rider && r.status == RideStatus::Completed && r.dropoff == Some(destination)
        })
    }

    /// The ride, if any, this driver is currently assigned to.
    pub fn active_assigned_ride_for_driver(&self, driver: UserId) -> Option<&RideRequest> {
        self.tables
            .rides
            .values()
            .find(|r| r.status == RideStatus::Assigned && r.assigned_driver == Some(driver))
    }

    // --- meetups ---

    pub fn insert_meetup(
        &mut self,
        organizer: UserId,
        destination: Coordinate,
        destination_address: impl Into<String>,
    ) -> MeetupId {
        self.tables.next_meetup += 1;
        let id = MeetupId(self.tables.next_meetup);
        self.tables.meetups.insert(
            id,
            Meetup {
                id,
                organizer,
                destination,
                destination_address: destination_address.into(),
                status: MeetupStatus::Pending,
                created_at: Utc::now(),
            },
        );
        id
    }

    pub fn meetup(&self, id: MeetupId) -> Option<&Meetup> {
        self.tables.meetups.get(&id)
    }

    pub fn meetup_mut(&mut self, id: MeetupId) -> Option<&mut Meetup> {
        self.tables.meetups.get_mut(&id)
    }

    /// Meetups not yet cancelled whose destination is exactly `destination`.
    pub fn live_meetups_at(&self, destination: Coordinate) -> Vec<Meetup> {
        self.tables
            .meetups
            .values()
            .filter(|m| m.status != MeetupStatus::Cancelled && m.destination == destination)
            .cloned()
            .collect()
    }

    // --- invites ---

    pub fn insert_invite(&mut self, meetup: MeetupId, invitee: UserId) -> InviteId {
        self.tables.next_invite += 1;
        let id = InviteId(self.tables.next_invite);
        self.tables.invites.insert(
            id,
            MeetupInvite {
                id,
                meetup,
                invitee,
                status: InviteStatus::Pending,
                pickup: None,
                pickup_address: None,
            },
        );
        id
    }

    pub fn invite(&self, id: InviteId) -> Option<&MeetupInvite> {
        self.tables.invites.get(&id)
    }

    pub fn invite_mut(&mut self, id: InviteId) -> Option<&mut MeetupInvite> {
        self.tables.invites.get_mut(&id)
    }

    pub fn invites_for_meetup(&self, meetup: MeetupId) -> Vec<MeetupInvite> {
        self.tables
            .invites
            .values()
            .filter(|i| i.meetup == meetup)
            .cloned()
            .collect()
    }
}
