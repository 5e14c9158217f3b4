//! Metric/imperial conversion for display.
//!
//! Inputs are always metric (°C, m/s); metric output is the input unchanged.

use wxdash_core::Units;

const MPS_TO_MPH: f64 = 2.23694;

pub fn to_display_temperature(celsius: f64, units: Units) -> f64 {
    match units {
        Units::Metric => celsius,
        Units::Imperial => celsius * 9.0 / 5.0 + 32.0,
    }
}

pub fn to_display_speed(mps: f64, units: Units) -> f64 {
    match units {
        Units::Metric => mps,
        Units::Imperial => mps * MPS_TO_MPH,
    }
}

/// Missing values stay missing.
pub fn display_temperature_opt(celsius: Option<f64>, units: Units) -> Option<f64> {
    celsius.map(|c| to_display_temperature(c, units))
}

pub fn display_speed_opt(mps: Option<f64>, units: Units) -> Option<f64> {
    mps.map(|s| to_display_speed(s, units))
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

pub fn mph_to_mps(mph: f64) -> f64 {
    mph / MPS_TO_MPH
}
