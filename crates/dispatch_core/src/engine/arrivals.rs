//! Meetup arrival tracking, run after every ride completion.

use tracing::debug;

use crate::error::EngineError;
use crate::model::{InviteStatus, MeetupId, MeetupStatus, RideRequest, UserId};
use crate::notify::{Notification, NotifyTarget};

use super::MatchEngine;

struct AllArrivedUpdate {
    meetup_id: MeetupId,
    organizer: UserId,
    total_participants: usize,
}

impl MatchEngine {
    /// Re-derives arrival state for every live meetup at the completed
    /// ride's destination.
    ///
    /// Participants are the organizer plus accepted invitees; a participant
    /// has arrived once they have a completed ride to the destination. When
    /// everyone has arrived the meetup flips to AllArrived (once; repeats
    /// are no-ops) and the organizer is notified. Partial arrivals promote
    /// Pending to InProgress silently.
    pub(crate) fn check_meetup_arrivals(&self, ride: &RideRequest) -> Result<(), EngineError> {
        let Some(destination) = ride.dropoff else {
            return Ok(());
        };

        let updates = self.store.transaction(|tx| {
            let mut updates: Vec<AllArrivedUpdate> = Vec::new();
            for meetup in tx.live_meetups_at(destination) {
                let accepted: Vec<UserId> = tx
                    .invites_for_meetup(meetup.id)
                    .iter()
                    .filter(|i| i.status == InviteStatus::Accepted)
                    .map(|i| i.invitee)
                    .collect();

                let is_participant =
                    ride.rider == meetup.organizer || accepted.contains(&ride.rider);
                if !is_participant {
                    continue;
                }

                let expected = accepted.len() + 1;
                let mut arrived = accepted
                    .iter()
                    .filter(|&&invitee| tx.has_completed_ride_to(invitee, destination))
                    .count();
                if tx.has_completed_ride_to(meetup.organizer, destination) {
                    arrived += 1;
                }

                if arrived == expected && meetup.status != MeetupStatus::AllArrived {
                    if let Some(row) = tx.meetup_mut(meetup.id) {
                        row.status = MeetupStatus::AllArrived;
                    }
                    updates.push(AllArrivedUpdate {
                        meetup_id: meetup.id,
                        organizer: meetup.organizer,
                        total_participants: expected,
                    });
                } else if arrived > 0 && meetup.status == MeetupStatus::Pending {
                    if let Some(row) = tx.meetup_mut(meetup.id) {
                        row.status = MeetupStatus::InProgress;
                    }
                    debug!(meetup = %meetup.id, arrived, expected, "meetup in progress");
                }
            }
            Ok(updates)
        })?;

        for update in updates {
            debug!(meetup = %update.meetup_id, "all meetup participants arrived");
            self.notify(
                NotifyTarget::Client(update.organizer),
                Notification::MeetupAllArrived {
                    message: "Everyone has arrived at the meetup!".into(),
                    meetup_id: update.meetup_id,
                    total_participants: update.total_participants,
                },
            );
        }
        Ok(())
    }
}
