//! Engine tuning knobs.

use std::time::Duration;

use crate::geo::DEFAULT_CITY_SPEED_KMH;

/// Search radius applied by proximity matching, in kilometers.
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;

/// How often the scheduler fires the matching tick.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub search_radius_km: f64,
    pub tick_interval: Duration,
    pub avg_speed_kmh: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
            tick_interval: DEFAULT_TICK_INTERVAL,
            avg_speed_kmh: DEFAULT_CITY_SPEED_KMH,
        }
    }
}

impl EngineConfig {
    pub fn with_search_radius_km(mut self, radius: f64) -> Self {
        self.search_radius_km = radius;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_avg_speed_kmh(mut self, speed: f64) -> Self {
        self.avg_speed_kmh = speed;
        self
    }
}
