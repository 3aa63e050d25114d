// Request options and typed results for vehicle calls.
//
// Status payloads differ wildly between regions and model years, so
// `status` / `full_status` stay raw JSON. The small, stable shapes
// (odometer, location) are typed.

use serde::{Deserialize, Serialize};

/// Options for a vehicle status query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOptions {
    /// Ask the car for fresh data instead of the service's cached copy.
    pub refresh: bool,
    /// Return the normalized status shape instead of the raw service payload.
    pub parsed: bool,
}

/// Options for a full status query (status + location + odometer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullStatusOptions {
    pub refresh: bool,
}

/// Odometer reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Odometer {
    pub value: f64,
    /// Distance unit as reported by the service (`km` or `mi`).
    pub unit: String,
}

/// Last reported GPS position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// Heading in degrees, 0 = north.
    pub heading: f64,
    pub speed: Speed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub value: f64,
    pub unit: String,
}
