//! Geographic math: coordinates, great-circle distance, and ETA estimation.
//!
//! This module provides:
//!
//! - **Coordinate**: a validated latitude/longitude pair
//! - **Distance calculations**: haversine distance between coordinates
//! - **ETA estimation**: travel time at a configurable average speed
//!
//! Distances use a spherical Earth (R = 6371 km) and are rounded to two
//! decimals, matching the per-km fare tables in [crate::pricing].

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average city driving speed used for ETA estimates (km/h).
pub const DEFAULT_CITY_SPEED_KMH: f64 = 30.0;

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the coordinate only when both components are finite and in range.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let coord = Self { lat, lng };
        coord.is_valid().then_some(coord)
    }

    /// Both components finite, lat in [-90, 90], lng in [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Haversine distance between two coordinates, rounded to 2 decimals.
///
/// Symmetric in its arguments; order-preserving for farther points.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lon1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lon2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    round2(EARTH_RADIUS_KM * c)
}

/// Travel time estimate for a distance at an average speed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eta {
    pub minutes: u64,
    /// Display form: `"15 min"` under an hour, `"1h 25m"` otherwise.
    pub formatted: String,
}

/// Estimate travel time, rounding minutes up.
pub fn eta(distance_km: f64, avg_speed_kmh: f64) -> Eta {
    let hours = distance_km / avg_speed_kmh;
    let minutes = (hours * 60.0).ceil().max(0.0) as u64;
    let formatted = if minutes < 60 {
        format!("{minutes} min")
    } else {
        format!("{}h {}m", minutes / 60, minutes % 60)
    };
    Eta { minutes, formatted }
}

/// Display form of a distance: `"850 m"` under 1 km, `"2.50 km"` otherwise.
pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{} m", (km * 1000.0).round() as i64)
    } else {
        format!("{km:.2} km")
    }
}

/// Round to 2 decimal places (monetary and km fields).
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MG_ROAD: Coordinate = Coordinate::new(12.9716, 77.5946);
    const INDIRANAGAR: Coordinate = Coordinate::new(12.9719, 77.6412);

    #[test]
    fn known_pair_distance_matches_haversine() {
        let d = distance_km(MG_ROAD, INDIRANAGAR);
        assert!((d - 5.05).abs() < 0.05, "expected ~5.05 km, got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        assert_eq!(
            distance_km(MG_ROAD, INDIRANAGAR),
            distance_km(INDIRANAGAR, MG_ROAD)
        );
    }

    #[test]
    fn zero_distance_for_same_point() {
        assert_eq!(distance_km(MG_ROAD, MG_ROAD), 0.0);
    }

    #[test]
    fn eta_formats_minutes_and_hours() {
        let short = eta(5.0, 30.0);
        assert_eq!(short.minutes, 10);
        assert_eq!(short.formatted, "10 min");

        let long = eta(42.5, 30.0);
        assert_eq!(long.minutes, 85);
        assert_eq!(long.formatted, "1h 25m");
    }

    #[test]
    fn eta_rounds_up_partial_minutes() {
        // 1 km at 30 km/h = 2 minutes exactly; 1.1 km rounds up to 3.
        assert_eq!(eta(1.1, 30.0).minutes, 3);
    }

    #[test]
    fn coordinate_validation_bounds() {
        assert!(Coordinate::new(12.9716, 77.5946).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(200.0, 77.5946).is_valid());
        assert!(!Coordinate::new(12.0, -181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
        assert!(Coordinate::checked(f64::INFINITY, 0.0).is_none());
    }

    #[test]
    fn format_distance_switches_units() {
        assert_eq!(format_distance(0.85), "850 m");
        assert_eq!(format_distance(2.5), "2.50 km");
    }

    proptest! {
        #[test]
        fn distance_symmetric_for_any_coordinates(
            lat1 in -90.0f64..90.0, lng1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0, lng2 in -180.0f64..180.0,
        ) {
            let a = Coordinate::new(lat1, lng1);
            let b = Coordinate::new(lat2, lng2);
            prop_assert_eq!(distance_km(a, b), distance_km(b, a));
        }

        #[test]
        fn distance_within_half_circumference(
            lat1 in -90.0f64..90.0, lng1 in -180.0f64..180.0,
            lat2 in -90.0f64..90.0, lng2 in -180.0f64..180.0,
        ) {
            let d = distance_km(Coordinate::new(lat1, lng1), Coordinate::new(lat2, lng2));
            prop_assert!(d >= 0.0);
            prop_assert!(d <= EARTH_RADIUS_KM * std::f64::consts::PI + 0.01);
        }
    }
}
