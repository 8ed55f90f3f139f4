//! Default selection policy: nearest driver within the radius, with
//! fallbacks for sparse supply and coordinate-free bookings.

use crate::geo::Coordinate;
use crate::proximity;

use super::policy::{Candidate, Selection, SelectionPolicy};

/// Prefers the closest driver within the search radius. When nobody is in
/// range, falls back to the closest driver anywhere (flagged). Rides booked
/// without a pickup coordinate take the first candidate FIFO.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProximityFirst;

impl SelectionPolicy for ProximityFirst {
    fn select(
        &self,
        pickup: Option<Coordinate>,
        candidates: &[Candidate],
        radius_km: f64,
        avg_speed_kmh: f64,
    ) -> Option<Selection> {
        let Some(pickup) = pickup else {
            return candidates.first().map(|c| Selection {
                driver: c.driver,
                approach: None,
                outside_radius: false,
            });
        };

        let located: Vec<_> = candidates
            .iter()
            .filter_map(|c| c.location.map(|loc| (c.driver, loc)))
            .collect();

        let (pick, outside_radius) =
            match proximity::find_nearby(pickup, &located, radius_km).into_iter().next() {
                Some(near) => (near, false),
                None => (
                    proximity::find_nearby(pickup, &located, f64::INFINITY)
                        .into_iter()
                        .next()?,
                    true,
                ),
            };

        Some(Selection {
            driver: pick.driver,
            approach: Some(proximity::driver_eta(pick.location, pickup, avg_speed_kmh)),
            outside_radius,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserId;

    const PICKUP: Coordinate = Coordinate::new(12.9716, 77.5946);

    fn candidate(id: i64, location: Option<Coordinate>) -> Candidate {
        Candidate {
            driver: UserId(id),
            location,
        }
    }

    #[test]
    fn picks_nearest_within_radius() {
        let candidates = [
            candidate(1, Some(Coordinate::new(12.9719, 77.6412))), // ~5 km
            candidate(2, Some(Coordinate::new(12.9726, 77.5950))), // ~0.1 km
        ];
        let selection = ProximityFirst
            .select(Some(PICKUP), &candidates, 10.0, 30.0)
            .unwrap();
        assert_eq!(selection.driver, UserId(2));
        assert!(!selection.outside_radius);
        assert!(selection.approach.is_some());
    }

    #[test]
    fn falls_back_outside_radius_when_nobody_in_range() {
        let candidates = [candidate(1, Some(Coordinate::new(13.1986, 77.7066)))]; // ~28 km
        let selection = ProximityFirst
            .select(Some(PICKUP), &candidates, 10.0, 30.0)
            .unwrap();
        assert_eq!(selection.driver, UserId(1));
        assert!(selection.outside_radius);
    }

    #[test]
    fn coordinate_free_booking_takes_first_candidate() {
        let candidates = [candidate(4, None), candidate(5, Some(PICKUP))];
        let selection = ProximityFirst.select(None, &candidates, 10.0, 30.0).unwrap();
        assert_eq!(selection.driver, UserId(4));
        assert!(selection.approach.is_none());
        assert!(!selection.outside_radius);
    }

    #[test]
    fn no_located_candidates_for_located_pickup_is_none() {
        let candidates = [candidate(1, None)];
        assert!(ProximityFirst
            .select(Some(PICKUP), &candidates, 10.0, 30.0)
            .is_none());
        assert!(ProximityFirst.select(Some(PICKUP), &[], 10.0, 30.0).is_none());
    }
}
