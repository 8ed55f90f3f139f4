//! Ride lifecycle operations: booking, estimates, cancellation, completion,
//! and driver rejection.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::geo::{self, Coordinate, Eta};
use crate::model::{DriverStatus, NewRide, RideId, RideStatus, UserId};
use crate::notify::{Notification, NotifyTarget};
use crate::pricing::{self, FareBreakdown, FareOptions, RideClass};

use super::MatchEngine;

/// Booking input, coordinates as raw degrees.
#[derive(Debug, Clone, Deserialize)]
pub struct BookRideRequest {
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub pickup_address: String,
    pub dropoff_lat: f64,
    pub dropoff_lng: f64,
    pub dropoff_address: String,
    /// Lowercase class name; absent means standard.
    pub ride_class: Option<String>,
}

/// What the rider gets back at booking time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideReceipt {
    pub ride_id: RideId,
    pub distance_km: f64,
    pub fare: FareBreakdown,
    pub eta: Eta,
}

/// Up-front quote across all service classes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FareEstimate {
    pub distance_km: f64,
    pub estimated_time: Eta,
    pub fare_options: FareOptions,
}

impl MatchEngine {
    /// Books a ride: validates coordinates and class, prices the trip, and
    /// enqueues it as Pending for the next matching tick.
    pub fn book_ride(
        &self,
        rider: UserId,
        request: BookRideRequest,
    ) -> Result<RideReceipt, EngineError> {
        let pickup = Coordinate::checked(request.pickup_lat, request.pickup_lng)
            .ok_or_else(|| EngineError::Validation("invalid pickup coordinates".into()))?;
        let dropoff = Coordinate::checked(request.dropoff_lat, request.dropoff_lng)
            .ok_or_else(|| EngineError::Validation("invalid dropoff coordinates".into()))?;
        let ride_class = match request.ride_class.as_deref() {
            None => RideClass::default(),
            Some(name) => RideClass::parse(name)
                .ok_or_else(|| EngineError::Validation(format!("unknown ride class: {name}")))?,
        };

        let distance_km = geo::distance_km(pickup, dropoff);
        let fare = pricing::calculate_fare(distance_km, ride_class);
        let eta = geo::eta(distance_km, self.config.avg_speed_kmh);

        let ride_id = self.store.transaction(|tx| {
            if tx.user(rider).is_none() {
                return Err(EngineError::NotFound(format!("user {rider}")));
            }
            let rider_name = tx.display_name(rider);
            Ok(tx.insert_ride(NewRide {
                rider,
                rider_name,
                pickup: Some(pickup),
                pickup_address: request.pickup_address.clone(),
                dropoff: Some(dropoff),
                dropoff_address: request.dropoff_address.clone(),
                distance_km: Some(distance_km),
                fare: Some(fare.total),
                ride_class,
            }))
        })?;

        info!(ride = %ride_id, rider = %rider, distance_km, "ride booked");
        Ok(RideReceipt {
            ride_id,
            distance_km,
            fare,
            eta,
        })
    }

    /// Prices a prospective trip without creating a ride.
    pub fn estimate_fare(
        &self,
        pickup_lat: f64,
        pickup_lng: f64,
        dropoff_lat: f64,
        dropoff_lng: f64,
    ) -> Result<FareEstimate, EngineError> {
        let pickup = Coordinate::checked(pickup_lat, pickup_lng)
            .ok_or_else(|| EngineError::Validation("invalid pickup coordinates".into()))?;
        let dropoff = Coordinate::checked(dropoff_lat, dropoff_lng)
            .ok_or_else(|| EngineError::Validation("invalid dropoff coordinates".into()))?;

        let distance_km = geo::distance_km(pickup, dropoff);
        Ok(FareEstimate {
            distance_km,
            estimated_time: geo::eta(distance_km, self.config.avg_speed_kmh),
            fare_options: pricing::fare_options(distance_km),
        })
    }

    /// Rider cancels their own ride. If a driver was already assigned, the
    /// driver is freed and told; the ride keeps the driver id for audit.
    pub fn cancel_ride(&self, rider: UserId, ride_id: RideId) -> Result<(), EngineError> {
        let freed_driver = self.store.transaction(|tx| {
            let ride = tx
                .ride(ride_id)
                .ok_or_else(|| EngineError::NotFound(format!("ride {ride_id}")))?
                .clone();
            if ride.rider != rider {
                return Err(EngineError::Unauthorized(format!(
                    "ride {ride_id} does not belong to user {rider}"
                )));
            }
            if ride.status.is_terminal() {
                return Err(EngineError::StateConflict {
                    entity: format!("ride {ride_id}"),
                    actual: ride.status.to_string(),
                });
            }

            let freed = if ride.status == RideStatus::Assigned {
                ride.assigned_driver
            } else {
                None
            };

            let ride_row = tx
                .ride_mut(ride_id)
                .ok_or_else(|| EngineError::NotFound(format!("ride {ride_id}")))?;
            ride_row.status = RideStatus::Cancelled;

            if let Some(driver) = freed {
                let driver_row = tx
                    .driver_mut(driver)
                    .ok_or_else(|| EngineError::NotFound(format!("driver {driver}")))?;
                driver_row.status = DriverStatus::Available;
            }

            Ok(freed.map(|driver| (driver, ride.pickup_address, ride.dropoff_address)))
        })?;

        info!(ride = %ride_id, rider = %rider, "ride cancelled by rider");
        if let Some((driver, pickup_address, dropoff_address)) = freed_driver {
            self.notify(
                NotifyTarget::Driver(driver),
                Notification::RideCancelledByClient {
                    message: "The rider cancelled this ride".into(),
                    ride_id,
                    pickup_address,
                    dropoff_address,
                },
            );
        }
        Ok(())
    }

    /// Assigned driver marks the trip done. Frees the driver, notifies the
    /// rider, then checks whether this arrival completes a meetup.
    pub fn complete_ride(&self, driver: UserId, ride_id: RideId) -> Result<(), EngineError> {
        let ride = self.store.transaction(|tx| {
            let ride = tx
                .ride(ride_id)
                .ok_or_else(|| EngineError::NotFound(format!("ride {ride_id}")))?
                .clone();
            if ride.status != RideStatus::Assigned {
                return Err(EngineError::StateConflict {
                    entity: format!("ride {ride_id}"),
                    actual: ride.status.to_string(),
                });
            }
            if ride.assigned_driver != Some(driver) {
                return Err(EngineError::Unauthorized(format!(
                    "ride {ride_id} is not assigned to driver {driver}"
                )));
            }

            let ride_row = tx
                .ride_mut(ride_id)
                .ok_or_else(|| EngineError::NotFound(format!("ride {ride_id}")))?;
            ride_row.status = RideStatus::Completed;
            let ride = ride_row.clone();

            let driver_row = tx
                .driver_mut(driver)
                .ok_or_else(|| EngineError::NotFound(format!("driver {driver}")))?;
            driver_row.status = DriverStatus::Available;

            Ok(ride)
        })?;

        info!(ride = %ride_id, driver = %driver, "ride completed");
        self.notify(
            NotifyTarget::Client(ride.rider),
            Notification::RideCompleted {
                message: "Your ride is complete. Thanks for riding!".into(),
                ride_id,
            },
        );

        // Arrival bookkeeping must never un-complete the ride.
        if let Err(err) = self.check_meetup_arrivals(&ride) {
            warn!(ride = %ride_id, error = %err, "meetup arrival check failed");
        }
        Ok(())
    }

    /// Assigned driver declines the ride. The ride goes back to Pending for
    /// the next tick; the approach estimate is cleared with the assignment.
    pub fn reject_ride(&self, driver: UserId, ride_id: RideId) -> Result<(), EngineError> {
        let rider = self.store.transaction(|tx| {
            let ride = tx
                .ride(ride_id)
                .ok_or_else(|| EngineError::NotFound(format!("ride {ride_id}")))?
                .clone();
            if ride.status != RideStatus::Assigned {
                return Err(EngineError::StateConflict {
                    entity: format!("ride {ride_id}"),
                    actual: ride.status.to_string(),
                });
            }
            if ride.assigned_driver != Some(driver) {
                return Err(EngineError::Unauthorized(format!(
                    "ride {ride_id} is not assigned to driver {driver}"
                )));
            }

            let ride_row = tx
                .ride_mut(ride_id)
                .ok_or_else(|| EngineError::NotFound(format!("ride {ride_id}")))?;
            ride_row.status = RideStatus::Pending;
            ride_row.assigned_driver = None;
            ride_row.driver_approach = None;
            let rider = ride_row.rider;

            let driver_row = tx
                .driver_mut(driver)
                .ok_or_else(|| EngineError::NotFound(format!("driver {driver}")))?;
            driver_row.status = DriverStatus::Available;

            Ok(rider)
        })?;

        info!(ride = %ride_id, driver = %driver, "ride rejected by driver, requeued");
        self.notify(
            NotifyTarget::Client(rider),
            Notification::RideCancelledByDriver {
                message: "Your driver cancelled. Finding you a new driver...".into(),
                ride_id,
            },
        );
        Ok(())
    }
}
