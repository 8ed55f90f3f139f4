//! Driver proximity search over raw coordinates.
//!
//! Distance lookups go through a process-wide LRU cache keyed by the bit
//! patterns of the coordinate pair; the key is symmetric so `a -> b` and
//! `b -> a` share an entry.

use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::geo::{self, Coordinate, Eta};
use crate::model::UserId;

const DISTANCE_CACHE_CAPACITY: usize = 50_000;

type PointKey = (u64, u64);
type PairKey = (PointKey, PointKey);

static DISTANCE_CACHE: OnceLock<Mutex<LruCache<PairKey, f64>>> = OnceLock::new();

fn point_key(c: Coordinate) -> PointKey {
    (c.lat.to_bits(), c.lng.to_bits())
}

fn pair_key(a: Coordinate, b: Coordinate) -> PairKey {
    let (ka, kb) = (point_key(a), point_key(b));
    if ka <= kb {
        (ka, kb)
    } else {
        (kb, ka)
    }
}

/// Haversine distance with a global LRU cache in front.
pub fn distance_km_cached(a: Coordinate, b: Coordinate) -> f64 {
    let cache = DISTANCE_CACHE.get_or_init(|| {
        let capacity = NonZeroUsize::new(DISTANCE_CACHE_CAPACITY)
            .unwrap_or(NonZeroUsize::MIN);
        Mutex::new(LruCache::new(capacity))
    });
    let key = pair_key(a, b);
    match cache.lock() {
        Ok(mut cache) => *cache.get_or_insert(key, || geo::distance_km(a, b)),
        // A poisoned cache only costs us the memoization.
        Err(_) => geo::distance_km(a, b),
    }
}

/// A driver within range of a pickup point.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyDriver {
    pub driver: UserId,
    pub location: Coordinate,
    pub distance_km: f64,
}

/// Filters drivers to those within `radius_km` of `origin`, sorted nearest
/// first. The sort is stable, so equidistant drivers keep their input order.
pub fn find_nearby(
    origin: Coordinate,
    drivers: &[(UserId, Coordinate)],
    radius_km: f64,
) -> Vec<NearbyDriver> {
    let mut nearby: Vec<NearbyDriver> = drivers
        .iter()
        .map(|&(driver, location)| NearbyDriver {
            driver,
            location,
            distance_km: distance_km_cached(origin, location),
        })
        .filter(|candidate| candidate.distance_km <= radius_km)
        .collect();
    nearby.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    nearby
}

/// Approach estimate from a driver's position to a pickup point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverEta {
    pub distance_km: f64,
    pub eta_minutes: u64,
    pub eta_formatted: String,
}

pub fn driver_eta(driver: Coordinate, pickup: Coordinate, avg_speed_kmh: f64) -> DriverEta {
    let distance_km = distance_km_cached(driver, pickup);
    let Eta { minutes, formatted } = geo::eta(distance_km, avg_speed_kmh);
    DriverEta {
        distance_km,
        eta_minutes: minutes,
        eta_formatted: formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: Coordinate = Coordinate::new(12.9716, 77.5946);

    fn fleet() -> Vec<(UserId, Coordinate)> {
        vec![
            (UserId(1), Coordinate::new(12.9719, 77.6412)), // ~5 km
            (UserId(2), Coordinate::new(12.9726, 77.5950)), // ~0.1 km
            (UserId(3), Coordinate::new(13.1986, 77.7066)), // ~28 km
        ]
    }

    #[test]
    fn nearby_sorted_ascending_and_filtered() {
        let nearby = find_nearby(ORIGIN, &fleet(), 10.0);
        let ids: Vec<UserId> = nearby.iter().map(|d| d.driver).collect();
        assert_eq!(ids, vec![UserId(2), UserId(1)]);
        assert!(nearby[0].distance_km <= nearby[1].distance_km);
    }

    #[test]
    fn unbounded_radius_keeps_everyone() {
        let nearby = find_nearby(ORIGIN, &fleet(), f64::INFINITY);
        assert_eq!(nearby.len(), 3);
        assert_eq!(nearby[2].driver, UserId(3));
    }

    #[test]
    fn empty_fleet_yields_empty() {
        assert!(find_nearby(ORIGIN, &[], 10.0).is_empty());
    }

    #[test]
    fn cached_distance_matches_uncached() {
        let b = Coordinate::new(12.9719, 77.6412);
        assert_eq!(distance_km_cached(ORIGIN, b), geo::distance_km(ORIGIN, b));
        // Symmetric key: reverse order hits the same entry.
        assert_eq!(distance_km_cached(b, ORIGIN), geo::distance_km(ORIGIN, b));
    }

    #[test]
    fn driver_eta_combines_distance_and_time() {
        let eta = driver_eta(Coordinate::new(12.9726, 77.5950), ORIGIN, 30.0);
        assert!(eta.distance_km < 0.5);
        assert_eq!(eta.eta_formatted, format!("{} min", eta.eta_minutes));
    }
}
