//! Driver registration and availability updates.

use serde::Deserialize;
use tracing::info;

use crate::error::EngineError;
use crate::geo::Coordinate;
use crate::model::{Driver, DriverStatus, UserId};

use super::MatchEngine;

/// Status update input; coordinates travel together or not at all.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverStatusUpdate {
    pub status: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl MatchEngine {
    /// Registers a driver profile for an existing user. A second
    /// registration for the same user is a conflict.
    pub fn register_driver(
        &self,
        user: UserId,
        name: impl Into<String>,
        vehicle: Option<String>,
        contact: Option<String>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        self.store.transaction(|tx| {
            if tx.driver(user).is_some() {
                return Err(EngineError::StateConflict {
                    entity: format!("driver {user}"),
                    actual: "registered".into(),
                });
            }
            tx.upsert_driver(Driver {
                user,
                name: name.clone(),
                vehicle: vehicle.clone(),
                contact: contact.clone(),
                location: None,
                status: DriverStatus::Offline,
            });
            Ok(())
        })?;
        info!(driver = %user, "driver registered");
        Ok(())
    }

    /// Updates a driver's availability and optionally their position.
    ///
    /// Unregistered users are auto-provisioned with a placeholder profile.
    /// A driver holding an Assigned ride stays not_available until they
    /// finish or reject the ride; they cannot free themselves.
    pub fn update_driver_status(
        &self,
        user: UserId,
        update: DriverStatusUpdate,
    ) -> Result<(), EngineError> {
        let status = DriverStatus::parse(&update.status).ok_or_else(|| {
            EngineError::Validation(format!("unknown driver status: {}", update.status))
        })?;
        let location = match (update.lat, update.lng) {
            (None, None) => None,
            (Some(lat), Some(lng)) => Some(
                Coordinate::checked(lat, lng)
                    .ok_or_else(|| EngineError::Validation("invalid driver coordinates".into()))?,
            ),
            _ => {
                return Err(EngineError::Validation(
                    "lat and lng must be provided together".into(),
                ))
            }
        };

        self.store.transaction(|tx| {
            if tx.driver(user).is_none() {
                tx.upsert_driver(Driver {
                    user,
                    name: format!("AutoDriver_{user}"),
                    vehicle: None,
                    contact: None,
                    location: None,
                    status: DriverStatus::Offline,
                });
            }

            if status != DriverStatus::NotAvailable {
                if let Some(ride) = tx.active_assigned_ride_for_driver(user) {
                    return Err(EngineError::StateConflict {
                        entity: format!("driver {user}"),
                        actual: format!("assigned to ride {}", ride.id),
                    });
                }
            }

            let driver = tx
                .driver_mut(user)
                .ok_or_else(|| EngineError::NotFound(format!("driver {user}")))?;
            driver.status = status;
            if let Some(location) = location {
                driver.location = Some(location);
            }
            Ok(())
        })?;

        info!(driver = %user, status = %status, "driver status updated");
        Ok(())
    }
}
