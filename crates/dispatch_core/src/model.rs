//! Domain records and status enums shared across the engine and store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;
use crate::pricing::RideClass;
use crate::proximity::DriverEta;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(
    /// Identifies a person, whether acting as rider, driver, or both.
    UserId
);
id_newtype!(RideId);
id_newtype!(MeetupId);
id_newtype!(InviteId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideStatus {
    Pending,
    Assigned,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for RideStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    NotAvailable,
    Offline,
}

impl DriverStatus {
    /// Parses the wire name used by status updates.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Self::Available),
            "not_available" => Some(Self::NotAvailable),
            "offline" => Some(Self::Offline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::NotAvailable => "not_available",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetupStatus {
    Pending,
    InProgress,
    AllArrived,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// A ride request through its whole lifecycle.
///
/// `assigned_driver` stays populated after completion and after
/// cancellation-while-assigned, as an audit trail; `Driver::status` is what
/// frees the driver for new work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideRequest {
    pub id: RideId,
    pub rider: UserId,
    pub rider_name: String,
    /// Absent for rides booked by address only.
    pub pickup: Option<Coordinate>,
    pub pickup_address: String,
    pub dropoff: Option<Coordinate>,
    pub dropoff_address: String,
    pub distance_km: Option<f64>,
    pub fare: Option<f64>,
    pub ride_class: RideClass,
    pub status: RideStatus,
    pub assigned_driver: Option<UserId>,
    pub driver_approach: Option<DriverEta>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub user: UserId,
    pub name: String,
    pub vehicle: Option<String>,
    pub contact: Option<String>,
    pub location: Option<Coordinate>,
    pub status: DriverStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meetup {
    pub id: MeetupId,
    pub organizer: UserId,
    pub destination: Coordinate,
    pub destination_address: String,
    pub status: MeetupStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetupInvite {
    pub id: InviteId,
    pub meetup: MeetupId,
    pub invitee: UserId,
    pub status: InviteStatus,
    /// Set when the invitee accepts with a pickup point.
    pub pickup: Option<Coordinate>,
    pub pickup_address: Option<String>,
}

/// Columns for inserting a new ride; the store assigns id, status, timestamp.
#[derive(Debug, Clone)]
pub struct NewRide {
    pub rider: UserId,
    pub rider_name: String,
    pub pickup: Option<Coordinate>,
    pub pickup_address: String,
    pub dropoff: Option<Coordinate>,
    pub dropoff_address: String,
    pub distance_km: Option<f64>,
    pub fare: Option<f64>,
    pub ride_class: RideClass,
}
