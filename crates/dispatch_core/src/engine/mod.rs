//! The matching engine: the periodic assignment tick plus every ride,
//! driver, and meetup state transition.
//!
//! All mutations run inside a single store transaction per operation, so a
//! failure midway leaves no partial state. Notifications are dispatched only
//! after the transaction commits.

mod arrivals;
mod drivers;
mod meetups;
mod rides;

pub use drivers::DriverStatusUpdate;
pub use meetups::{CreateMeetupRequest, InviteReply, MeetupCancelOutcome, MeetupCreated};
pub use rides::{BookRideRequest, FareEstimate, RideReceipt};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::matching::{Candidate, ProximityFirst, SelectionPolicy};
use crate::model::{Driver, DriverStatus, RideId, RideRequest, RideStatus, UserId};
use crate::notify::{DeliveryStatus, Notification, NotificationDispatcher, NotifyTarget};
use crate::store::MemoryStore;

/// What one matching tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No pending rides.
    Idle,
    /// A ride is waiting but no driver could be selected.
    NoDriver { ride: RideId },
    /// A driver was assigned and both parties were notified.
    Assigned {
        ride: RideId,
        driver: UserId,
        outside_radius: bool,
    },
}

struct CommittedAssignment {
    ride: RideRequest,
    driver: Driver,
    outside_radius: bool,
}

enum TickStage {
    Idle,
    NoDriver { ride: RideId },
    Committed(Box<CommittedAssignment>),
}

pub struct MatchEngine {
    store: Arc<MemoryStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    policy: Box<dyn SelectionPolicy>,
    config: EngineConfig,
}

impl MatchEngine {
    pub fn new(store: Arc<MemoryStore>, dispatcher: Arc<dyn NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            policy: Box::new(ProximityFirst),
            config: EngineConfig::default(),
        }
    }

    pub fn with_policy(mut self, policy: Box<dyn SelectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// One matching pass: take the oldest pending ride, pick a driver, and
    /// commit the assignment. At most one ride is assigned per tick.
    pub fn tick(&self) -> Result<TickOutcome, EngineError> {
        let radius = self.config.search_radius_km;
        let speed = self.config.avg_speed_kmh;
        let policy = self.policy.as_ref();

        let stage = self.store.transaction(|tx| {
            let Some(ride) = tx.oldest_pending_ride() else {
                return Ok(TickStage::Idle);
            };

            let candidates: Vec<Candidate> = tx
                .available_drivers()
                .iter()
                .map(|d| Candidate {
                    driver: d.user,
                    location: d.location,
                })
                .collect();

            let Some(selection) = policy.select(ride.pickup, &candidates, radius, speed) else {
                return Ok(TickStage::NoDriver { ride: ride.id });
            };

            // Ride row first, driver row second.
            let ride_row = tx
                .ride_mut(ride.id)
                .ok_or_else(|| EngineError::NotFound(format!("ride {}", ride.id)))?;
            ride_row.status = RideStatus::Assigned;
            ride_row.assigned_driver = Some(selection.driver);
            ride_row.driver_approach = selection.approach.clone();
            let ride = ride_row.clone();

            let driver_row = tx
                .driver_mut(selection.driver)
                .ok_or_else(|| EngineError::NotFound(format!("driver {}", selection.driver)))?;
            driver_row.status = DriverStatus::NotAvailable;
            let driver = driver_row.clone();

            Ok(TickStage::Committed(Box::new(CommittedAssignment {
                ride,
                driver,
                outside_radius: selection.outside_radius,
            })))
        })?;

        match stage {
            TickStage::Idle => Ok(TickOutcome::Idle),
            TickStage::NoDriver { ride } => {
                debug!(ride = %ride, "no driver available for pending ride");
                Ok(TickOutcome::NoDriver { ride })
            }
            TickStage::Committed(assignment) => {
                let CommittedAssignment {
                    ride,
                    driver,
                    outside_radius,
                } = *assignment;
                info!(
                    ride = %ride.id,
                    driver = %driver.user,
                    outside_radius,
                    "assigned driver to ride"
                );
                if outside_radius {
                    warn!(
                        ride = %ride.id,
                        driver = %driver.user,
                        radius_km = radius,
                        "nearest driver is outside the search radius"
                    );
                }

                let (distance, eta) = ride
                    .driver_approach
                    .as_ref()
                    .map(|a| (Some(a.distance_km), Some(a.eta_formatted.clone())))
                    .unwrap_or((None, None));

                self.notify(
                    NotifyTarget::Client(ride.rider),
                    Notification::RideAssigned {
                        message: format!("Driver {} is on the way!", driver.name),
                        ride_id: ride.id,
                        driver_id: driver.user,
                        driver_name: driver.name.clone(),
                        vehicle: driver.vehicle.clone(),
                        contact: driver.contact.clone(),
                        driver_distance_km: distance,
                        driver_eta: eta.clone(),
                    },
                );
                self.notify(
                    NotifyTarget::Driver(driver.user),
                    Notification::NewRideAssigned {
                        message: format!("New ride request from {}", ride.rider_name),
                        ride_id: ride.id,
                        rider_id: ride.rider,
                        rider_name: ride.rider_name.clone(),
                        pickup_address: ride.pickup_address.clone(),
                        dropoff_address: ride.dropoff_address.clone(),
                        pickup_distance_km: distance,
                        pickup_eta: eta,
                    },
                );

                Ok(TickOutcome::Assigned {
                    ride: ride.id,
                    driver: driver.user,
                    outside_radius,
                })
            }
        }
    }

    /// Fire-and-forget dispatch with delivery logging.
    pub(crate) fn notify(&self, target: NotifyTarget, notification: Notification) {
        match self.dispatcher.send(&target, &notification) {
            DeliveryStatus::Delivered => {
                debug!(target = %target, kind = notification.kind(), "notification delivered");
            }
            DeliveryStatus::NoConnection => {
                warn!(target = %target, kind = notification.kind(), "notification dropped: no connection");
            }
        }
    }
}
