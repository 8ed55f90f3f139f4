//! Fare calculation: per-class rate tables, minimum-fare floor, service fee
//! and tax. All monetary amounts are rounded to 2 decimals.

use serde::{Deserialize, Serialize};

use crate::geo::round2;

/// Tax applied on the subtotal (trip fare + service fee).
pub const TAX_RATE: f64 = 0.18;

/// Service class of a ride, selecting the rate table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RideClass {
    #[default]
    Standard,
    Premium,
    Shared,
}

impl RideClass {
    /// Parses the lowercase wire name. Unknown names are rejected, not defaulted.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(Self::Standard),
            "premium" => Some(Self::Premium),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
            Self::Shared => "shared",
        }
    }

    fn rates(&self) -> RateTable {
        match self {
            Self::Standard => RateTable {
                base_fare: 50.0,
                per_km: 15.0,
                min_fare: 80.0,
                service_fee: 10.0,
            },
            Self::Premium => RateTable {
                base_fare: 100.0,
                per_km: 25.0,
                min_fare: 150.0,
                service_fee: 15.0,
            },
            Self::Shared => RateTable {
                base_fare: 30.0,
                per_km: 10.0,
                min_fare: 50.0,
                service_fee: 5.0,
            },
        }
    }
}

impl std::fmt::Display for RideClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rate parameters for one service class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTable {
    pub base_fare: f64,
    pub per_km: f64,
    pub min_fare: f64,
    pub service_fee: f64,
}

/// Itemized fare for one ride.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub distance_km: f64,
    pub base_fare: f64,
    pub distance_fare: f64,
    /// `max(base_fare + distance_fare, min_fare)`.
    pub trip_fare: f64,
    pub service_fee: f64,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub ride_class: RideClass,
}

/// Computes the itemized fare for a distance and service class.
///
/// The minimum fare floors the trip fare, not the total; the service fee and
/// tax are applied on top of the floored value.
pub fn calculate_fare(distance_km: f64, ride_class: RideClass) -> FareBreakdown {
    let rates = ride_class.rates();
    let distance_fare = round2(distance_km * rates.per_km);
    let trip_fare = round2((rates.base_fare + distance_fare).max(rates.min_fare));
    let subtotal = round2(trip_fare + rates.service_fee);
    let tax = round2(subtotal * TAX_RATE);
    let total = round2(subtotal + tax);
    FareBreakdown {
        distance_km,
        base_fare: rates.base_fare,
        distance_fare,
        trip_fare,
        service_fee: rates.service_fee,
        subtotal,
        tax,
        total,
        ride_class,
    }
}

/// Fare breakdowns for every service class, for up-front estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareOptions {
    pub standard: FareBreakdown,
    pub premium: FareBreakdown,
    pub shared: FareBreakdown,
}

pub fn fare_options(distance_km: f64) -> FareOptions {
    FareOptions {
        standard: calculate_fare(distance_km, RideClass::Standard),
        premium: calculate_fare(distance_km, RideClass::Premium),
        shared: calculate_fare(distance_km, RideClass::Shared),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn standard_fare_above_minimum() {
        let fare = calculate_fare(5.0, RideClass::Standard);
        assert_eq!(fare.distance_fare, 75.0);
        assert_eq!(fare.trip_fare, 125.0);
        assert_eq!(fare.subtotal, 135.0);
        assert_eq!(fare.tax, 24.3);
        assert_eq!(fare.total, 159.3);
    }

    #[test]
    fn short_trip_hits_minimum_fare() {
        let fare = calculate_fare(0.1, RideClass::Standard);
        assert_eq!(fare.trip_fare, 80.0);
        assert_eq!(fare.subtotal, 90.0);
        assert_eq!(fare.total, 106.2);
    }

    #[test]
    fn premium_costs_more_than_standard_costs_more_than_shared() {
        let options = fare_options(8.0);
        assert!(options.premium.total > options.standard.total);
        assert!(options.standard.total > options.shared.total);
    }

    #[test]
    fn ride_class_parsing() {
        assert_eq!(RideClass::parse("premium"), Some(RideClass::Premium));
        assert_eq!(RideClass::parse("Standard"), None);
        assert_eq!(RideClass::parse("luxury"), None);
        assert_eq!(RideClass::default(), RideClass::Standard);
    }

    proptest! {
        #[test]
        fn fare_is_monotonic_in_distance(
            d1 in 0.0f64..500.0,
            delta in 0.0f64..100.0,
        ) {
            let near = calculate_fare(d1, RideClass::Standard);
            let far = calculate_fare(d1 + delta, RideClass::Standard);
            prop_assert!(far.total >= near.total);
        }

        #[test]
        fn total_never_below_taxed_minimum(d in 0.0f64..500.0) {
            for class in [RideClass::Standard, RideClass::Premium, RideClass::Shared] {
                let fare = calculate_fare(d, class);
                let floor = (class.rates().min_fare + fare.service_fee) * (1.0 + TAX_RATE);
                prop_assert!(fare.total + 0.01 >= floor);
            }
        }
    }
}
