//! Driver selection seam for the matching tick.

use crate::geo::Coordinate;
use crate::model::UserId;
use crate::proximity::DriverEta;

/// An Available driver offered to the policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub driver: UserId,
    /// None for drivers who have never reported a position.
    pub location: Option<Coordinate>,
}

/// The policy's pick for one pending ride.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub driver: UserId,
    /// Approach estimate to the pickup; None when either side lacks coordinates.
    pub approach: Option<DriverEta>,
    /// True when the pick fell back beyond the configured search radius.
    pub outside_radius: bool,
}

/// Picks at most one driver for a pending ride.
///
/// `candidates` are in queue order (oldest registration first); a policy
/// that ignores geometry can take them FIFO.
pub trait SelectionPolicy: Send + Sync {
    fn select(
        &self,
        pickup: Option<Coordinate>,
        candidates: &[Candidate],
        radius_km: f64,
        avg_speed_kmh: f64,
    ) -> Option<Selection>;
}
