//! Group meetups: creation with invites, invite responses that book rides,
//! and the cancellation cascade.

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::geo::{self, Coordinate};
use crate::model::{
    DriverStatus, InviteId, InviteStatus, MeetupId, MeetupStatus, NewRide, RideId, RideStatus,
    UserId,
};
use crate::notify::{Notification, NotifyTarget};
use crate::pricing::{self, RideClass};

use super::rides::RideReceipt;
use super::MatchEngine;

/// Fare recorded for invite acceptances that arrive without a pickup
/// coordinate; there is no distance to price from.
const DEFAULT_MEETUP_FARE: f64 = 100.0;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMeetupRequest {
    pub destination_lat: f64,
    pub destination_lng: f64,
    pub destination_address: String,
    pub invitees: Vec<UserId>,
    pub organizer_pickup_lat: f64,
    pub organizer_pickup_lng: f64,
    pub organizer_pickup_address: String,
}

#[derive(Debug, Clone)]
pub struct MeetupCreated {
    pub meetup_id: MeetupId,
    pub organizer_ride: RideReceipt,
    pub invites: Vec<InviteId>,
}

/// Invitee's answer to a meetup invite.
#[derive(Debug, Clone)]
pub enum InviteReply {
    Accept {
        pickup_lat: Option<f64>,
        pickup_lng: Option<f64>,
        pickup_address: Option<String>,
    },
    Reject,
}

/// Tally of the cancellation cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeetupCancelOutcome {
    pub meetup_id: MeetupId,
    pub cancelled_rides: usize,
    /// Rides whose cancellation transaction failed; they are left untouched.
    pub failed_rides: usize,
    pub notified_invitees: usize,
}

impl MatchEngine {
    /// Creates a meetup: one transaction covers the meetup record, the
    /// organizer's ride to the destination, and a pending invite per
    /// invitee. Invitees are notified after commit.
    pub fn create_meetup(
        &self,
        organizer: UserId,
        request: CreateMeetupRequest,
    ) -> Result<MeetupCreated, EngineError> {
        let destination =
            Coordinate::checked(request.destination_lat, request.destination_lng)
                .ok_or_else(|| EngineError::Validation("invalid destination coordinates".into()))?;
        let pickup =
            Coordinate::checked(request.organizer_pickup_lat, request.organizer_pickup_lng)
                .ok_or_else(|| EngineError::Validation("invalid pickup coordinates".into()))?;

        let distance_km = geo::distance_km(pickup, destination);
        let fare = pricing::calculate_fare(distance_km, RideClass::Standard);
        let eta = geo::eta(distance_km, self.config.avg_speed_kmh);

        let (created, organizer_name) = self.store.transaction(|tx| {
            if tx.user(organizer).is_none() {
                return Err(EngineError::NotFound(format!("user {organizer}")));
            }
            for invitee in &request.invitees {
                if tx.user(*invitee).is_none() {
                    return Err(EngineError::NotFound(format!("user {invitee}")));
                }
            }

            let organizer_name = tx.display_name(organizer);
            let meetup_id =
                tx.insert_meetup(organizer, destination, request.destination_address.clone());
            let ride_id = tx.insert_ride(NewRide {
                rider: organizer,
                rider_name: organizer_name.clone(),
                pickup: Some(pickup),
                pickup_address: request.organizer_pickup_address.clone(),
                dropoff: Some(destination),
                dropoff_address: request.destination_address.clone(),
                distance_km: Some(distance_km),
                fare: Some(fare.total),
                ride_class: RideClass::Standard,
            });
            let invites = request
                .invitees
                .iter()
                .map(|&invitee| tx.insert_invite(meetup_id, invitee))
                .collect();

            Ok((
                MeetupCreated {
                    meetup_id,
                    organizer_ride: RideReceipt {
                        ride_id,
                        distance_km,
                        fare: fare.clone(),
                        eta: eta.clone(),
                    },
                    invites,
                },
                organizer_name,
            ))
        })?;

        info!(
            meetup = %created.meetup_id,
            organizer = %organizer,
            invitees = request.invitees.len(),
            "meetup created"
        );
        for (invitee, invite_id) in request.invitees.iter().zip(&created.invites) {
            self.notify(
                NotifyTarget::Client(*invitee),
                Notification::NewMeetupInvite {
                    message: format!("{organizer_name} invited you to a meetup!"),
                    meetup_id: created.meetup_id,
                    invite_id: *invite_id,
                    organizer_name: organizer_name.clone(),
                    destination_address: request.destination_address.clone(),
                },
            );
        }
        Ok(created)
    }

    /// Records an invitee's response. Accepting books a ride to the meetup
    /// destination and returns its id; rejecting returns `None`.
    ///
    /// Acceptances without a pickup coordinate fall back to an address-only
    /// ride with a flat fare.
    pub fn respond_to_invite(
        &self,
        invitee: UserId,
        invite_id: InviteId,
        reply: InviteReply,
    ) -> Result<Option<RideId>, EngineError> {
        enum Response {
            Accepted {
                ride_id: RideId,
                meetup_id: MeetupId,
                organizer: UserId,
                invitee_name: String,
            },
            Rejected {
                meetup_id: MeetupId,
                organizer: UserId,
            },
        }

        let response = self.store.transaction(|tx| {
            let invite = tx
                .invite(invite_id)
                .ok_or_else(|| EngineError::NotFound(format!("invite {invite_id}")))?
                .clone();
            if invite.invitee != invitee {
                return Err(EngineError::Unauthorized(format!(
                    "invite {invite_id} does not belong to user {invitee}"
                )));
            }
            if invite.status != InviteStatus::Pending {
                return Err(EngineError::StateConflict {
                    entity: format!("invite {invite_id}"),
                    actual: format!("{:?}", invite.status).to_lowercase(),
                });
            }
            let meetup = tx
                .meetup(invite.meetup)
                .ok_or_else(|| EngineError::NotFound(format!("meetup {}", invite.meetup)))?
                .clone();

            match reply {
                InviteReply::Reject => {
                    let row = tx
                        .invite_mut(invite_id)
                        .ok_or_else(|| EngineError::NotFound(format!("invite {invite_id}")))?;
                    row.status = InviteStatus::Rejected;
                    Ok(Response::Rejected {
                        meetup_id: meetup.id,
                        organizer: meetup.organizer,
                    })
                }
                InviteReply::Accept {
                    pickup_lat,
                    pickup_lng,
                    ref pickup_address,
                } => {
                    if meetup.status == MeetupStatus::Cancelled {
                        return Err(EngineError::StateConflict {
                            entity: format!("meetup {}", meetup.id),
                            actual: "cancelled".into(),
                        });
                    }
                    let pickup = match (pickup_lat, pickup_lng) {
                        (None, None) => None,
                        (Some(lat), Some(lng)) => {
                            Some(Coordinate::checked(lat, lng).ok_or_else(|| {
                                EngineError::Validation("invalid pickup coordinates".into())
                            })?)
                        }
                        _ => {
                            return Err(EngineError::Validation(
                                "pickup lat and lng must be provided together".into(),
                            ))
                        }
                    };
                    if pickup.is_none() && pickup_address.is_none() {
                        return Err(EngineError::Validation(
                            "a pickup coordinate or address is required to accept".into(),
                        ));
                    }

                    let (distance_km, fare) = match pickup {
                        Some(pickup) => {
                            let d = geo::distance_km(pickup, meetup.destination);
                            let f = pricing::calculate_fare(d, RideClass::Standard);
                            (Some(d), f.total)
                        }
                        None => (None, DEFAULT_MEETUP_FARE),
                    };
                    let pickup_address = pickup_address
                        .clone()
                        .unwrap_or_else(|| "Current location".to_string());

                    let invitee_name = tx.display_name(invitee);
                    let ride_id = tx.insert_ride(NewRide {
                        rider: invitee,
                        rider_name: invitee_name.clone(),
                        pickup,
                        pickup_address: pickup_address.clone(),
                        dropoff: Some(meetup.destination),
                        dropoff_address: meetup.destination_address.clone(),
                        distance_km,
                        fare: Some(fare),
                        ride_class: RideClass::Standard,
                    });

                    let row = tx
                        .invite_mut(invite_id)
                        .ok_or_else(|| EngineError::NotFound(format!("invite {invite_id}")))?;
                    row.status = InviteStatus::Accepted;
                    row.pickup = pickup;
                    row.pickup_address = Some(pickup_address);

                    Ok(Response::Accepted {
                        ride_id,
                        meetup_id: meetup.id,
                        organizer: meetup.organizer,
                        invitee_name,
                    })
                }
            }
        })?;

        match response {
            Response::Accepted {
                ride_id,
                meetup_id,
                organizer,
                invitee_name,
            } => {
                info!(invite = %invite_id, meetup = %meetup_id, ride = %ride_id, "invite accepted");
                self.notify(
                    NotifyTarget::Client(organizer),
                    Notification::MeetupInviteAccepted {
                        message: format!("{invitee_name} is coming to your meetup!"),
                        meetup_id,
                        invitee_name,
                    },
                );
                Ok(Some(ride_id))
            }
            Response::Rejected {
                meetup_id,
                organizer,
            } => {
                info!(invite = %invite_id, meetup = %meetup_id, "invite rejected");
                self.notify(
                    NotifyTarget::Client(organizer),
                    Notification::MeetupInviteRejected {
                        message: "An invitee can't make it to your meetup".into(),
                        meetup_id,
                    },
                );
                Ok(None)
            }
        }
    }

    /// Cancels a meetup and cascades to its participants' rides.
    ///
    /// Each associated active ride is cancelled in its own transaction;
    /// completed rides are never touched. A ride whose cancellation fails is
    /// counted and skipped, and the cascade keeps going. The meetup and its
    /// invites flip to Cancelled in a final transaction.
    pub fn cancel_meetup(
        &self,
        organizer: UserId,
        meetup_id: MeetupId,
        reason: impl Into<String>,
    ) -> Result<MeetupCancelOutcome, EngineError> {
        let reason = reason.into();

        // Phase 1: authorize and collect the cascade targets.
        let (organizer_name, accepted_invitees, ride_ids) =
            self.store.transaction(|tx| {
                let meetup = tx
                    .meetup(meetup_id)
                    .ok_or_else(|| EngineError::NotFound(format!("meetup {meetup_id}")))?
                    .clone();
                if meetup.organizer != organizer {
                    return Err(EngineError::Unauthorized(format!(
                        "meetup {meetup_id} does not belong to user {organizer}"
                    )));
                }
                if meetup.status == MeetupStatus::Cancelled {
                    return Err(EngineError::StateConflict {
                        entity: format!("meetup {meetup_id}"),
                        actual: "cancelled".into(),
                    });
                }

                let accepted: Vec<UserId> = tx
                    .invites_for_meetup(meetup_id)
                    .iter()
                    .filter(|i| i.status == InviteStatus::Accepted)
                    .map(|i| i.invitee)
                    .collect();
                let mut participants = accepted.clone();
                participants.push(meetup.organizer);
                let ride_ids: Vec<RideId> = tx
                    .active_rides_to(meetup.destination, &participants)
                    .iter()
                    .map(|r| r.id)
                    .collect();
                let organizer_name = tx.display_name(organizer);
                Ok((organizer_name, accepted, ride_ids))
            })?;

        // Phase 2: cancel each ride independently.
        let mut cancelled = 0usize;
        let mut failed = 0usize;
        let mut notices: Vec<(NotifyTarget, Notification)> = Vec::new();
        for ride_id in ride_ids {
            let result = self.store.transaction(|tx| {
                let ride = tx
                    .ride(ride_id)
                    .ok_or_else(|| EngineError::NotFound(format!("ride {ride_id}")))?
                    .clone();
                if ride.status.is_terminal() {
                    return Ok(None);
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
                Ok(Some((ride.rider, freed)))
            });

            match result {
                Ok(Some((rider, freed_driver))) => {
                    cancelled += 1;
                    notices.push((
                        NotifyTarget::Client(rider),
                        Notification::RideCancelledByMeetup {
                            message: format!("The meetup was cancelled: {reason}"),
                            ride_id,
                            meetup_id,
                            reason: reason.clone(),
                        },
                    ));
                    if let Some(driver) = freed_driver {
                        notices.push((
                            NotifyTarget::Driver(driver),
                            Notification::RideCancelledByMeetup {
                                message: "This ride's meetup was cancelled".into(),
                                ride_id,
                                meetup_id,
                                reason: reason.clone(),
                            },
                        ));
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    failed += 1;
                    warn!(ride = %ride_id, meetup = %meetup_id, error = %err, "cascade ride cancellation failed");
                }
            }
        }

        // Phase 3: flip the invites and the meetup itself.
        self.store.transaction(|tx| {
            for invite in tx.invites_for_meetup(meetup_id) {
                if invite.status != InviteStatus::Rejected {
                    if let Some(row) = tx.invite_mut(invite.id) {
                        row.status = InviteStatus::Cancelled;
                    }
                }
            }
            let row = tx
                .meetup_mut(meetup_id)
                .ok_or_else(|| EngineError::NotFound(format!("meetup {meetup_id}")))?;
            row.status = MeetupStatus::Cancelled;
            Ok(())
        })?;

        info!(
            meetup = %meetup_id,
            cancelled_rides = cancelled,
            failed_rides = failed,
            "meetup cancelled"
        );
        for (target, notification) in notices {
            self.notify(target, notification);
        }
        for invitee in &accepted_invitees {
            self.notify(
                NotifyTarget::Client(*invitee),
                Notification::MeetupCancelled {
                    message: format!("{organizer_name} cancelled the meetup: {reason}"),
                    meetup_id,
                    organizer_name: organizer_name.clone(),
                    reason: reason.clone(),
                },
            );
        }

        Ok(MeetupCancelOutcome {
            meetup_id,
            cancelled_rides: cancelled,
            failed_rides: failed,
            notified_invitees: accepted_invitees.len(),
        })
    }
}
