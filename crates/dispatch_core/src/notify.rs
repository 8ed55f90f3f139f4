//! Outbound notifications and the dispatcher seam.
//!
//! The engine emits [`Notification`] values addressed to a [`NotifyTarget`]
//! and hands them to a [`NotificationDispatcher`]. Delivery is fire and
//! forget: a failed delivery is reported as [`DeliveryStatus::NoConnection`]
//! and logged, never retried, and never fails the operation that emitted it.

use serde::Serialize;
use serde_json::Value;

use crate::model::{InviteId, MeetupId, RideId, UserId};

/// Delivery address for a notification. Riders and drivers get distinct
/// key namespaces even when they are the same person.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyTarget {
    Client(UserId),
    Driver(UserId),
}

impl NotifyTarget {
    /// Registry key: `client_{id}` or `driver_{id}`.
    pub fn key(&self) -> String {
        match self {
            Self::Client(id) => format!("client_{id}"),
            Self::Driver(id) => format!("driver_{id}"),
        }
    }
}

impl std::fmt::Display for NotifyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

/// Every message the engine can emit. Closed set; payload shape is fixed
/// per variant and serializes with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    RideAssigned {
        message: String,
        ride_id: RideId,
        driver_id: UserId,
        driver_name: String,
        vehicle: Option<String>,
        contact: Option<String>,
        driver_distance_km: Option<f64>,
        driver_eta: Option<String>,
    },
    NewRideAssigned {
        message: String,
        ride_id: RideId,
        rider_id: UserId,
        rider_name: String,
        pickup_address: String,
        dropoff_address: String,
        pickup_distance_km: Option<f64>,
        pickup_eta: Option<String>,
    },
    RideCompleted {
        message: String,
        ride_id: RideId,
    },
    RideCancelledByDriver {
        message: String,
        ride_id: RideId,
    },
    RideCancelledByClient {
        message: String,
        ride_id: RideId,
        pickup_address: String,
        dropoff_address: String,
    },
    RideCancelledByMeetup {
        message: String,
        ride_id: RideId,
        meetup_id: MeetupId,
        reason: String,
    },
    NewMeetupInvite {
        message: String,
        meetup_id: MeetupId,
        invite_id: InviteId,
        organizer_name: String,
        destination_address: String,
    },
    MeetupInviteAccepted {
        message: String,
        meetup_id: MeetupId,
        invitee_name: String,
    },
    MeetupInviteRejected {
        message: String,
        meetup_id: MeetupId,
    },
    MeetupAllArrived {
        message: String,
        meetup_id: MeetupId,
        total_participants: usize,
    },
    MeetupCancelled {
        message: String,
        meetup_id: MeetupId,
        organizer_name: String,
        reason: String,
    },
}

impl Notification {
    /// The wire `type` tag, for logging and assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RideAssigned { .. } => "ride_assigned",
            Self::NewRideAssigned { .. } => "new_ride_assigned",
            Self::RideCompleted { .. } => "ride_completed",
            Self::RideCancelledByDriver { .. } => "ride_cancelled_by_driver",
            Self::RideCancelledByClient { .. } => "ride_cancelled_by_client",
            Self::RideCancelledByMeetup { .. } => "ride_cancelled_by_meetup",
            Self::NewMeetupInvite { .. } => "new_meetup_invite",
            Self::MeetupInviteAccepted { .. } => "meetup_invite_accepted",
            Self::MeetupInviteRejected { .. } => "meetup_invite_rejected",
            Self::MeetupAllArrived { .. } => "meetup_all_arrived",
            Self::MeetupCancelled { .. } => "meetup_cancelled",
        }
    }

    /// JSON payload as delivered on the wire.
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Outcome of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered,
    /// The target has no live connection; the message is dropped.
    NoConnection,
}

/// Transport seam. Implementations push payloads to connected clients
/// (websockets in production, a recording buffer in tests).
pub trait NotificationDispatcher: Send + Sync {
    fn send(&self, target: &NotifyTarget, notification: &Notification) -> DeliveryStatus;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_keys_are_namespaced() {
        assert_eq!(NotifyTarget::Client(UserId(7)).key(), "client_7");
        assert_eq!(NotifyTarget::Driver(UserId(7)).key(), "driver_7");
        assert_ne!(
            NotifyTarget::Client(UserId(7)),
            NotifyTarget::Driver(UserId(7))
        );
    }

    #[test]
    fn payload_carries_type_tag() {
        let n = Notification::RideCompleted {
            message: "Your ride is complete".into(),
            ride_id: RideId(3),
        };
        let payload = n.to_payload();
        assert_eq!(payload["type"], "ride_completed");
        assert_eq!(payload["ride_id"], 3);
        assert_eq!(n.kind(), "ride_completed");
    }
}
