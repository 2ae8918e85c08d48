/// Shared unit conversions for buoy telemetry
///
/// NDBC-style feeds report wind in m/s, wave heights in meters, and
/// temperatures in Celsius. Alert emails and hazard thresholds use the
/// customary marine units (knots, feet, Fahrenheit, nautical miles), so
/// every reading is converted exactly once at parse time.
pub const MS_TO_KNOTS: f64 = 1.94384;
pub const METERS_TO_FEET: f64 = 3.28084;
pub const KM_TO_NAUTICAL_MILES: f64 = 0.539957;

/// Convert a wind speed from meters per second to knots.
///
/// # Examples
///
/// ```
/// use weather_alert_service::units::ms_to_knots;
///
/// let knots = ms_to_knots(10.0);
/// assert!((knots - 19.4384).abs() < 1e-9);
/// ```
pub fn ms_to_knots(ms: f64) -> f64 {
    ms * MS_TO_KNOTS
}

/// Convert a length from meters to feet.
pub fn meters_to_feet(meters: f64) -> f64 {
    meters * METERS_TO_FEET
}

/// Convert a temperature from Celsius to Fahrenheit.
///
/// # Examples
///
/// ```
/// use weather_alert_service::units::celsius_to_fahrenheit;
///
/// assert_eq!(celsius_to_fahrenheit(0.0), 32.0);
/// assert_eq!(celsius_to_fahrenheit(100.0), 212.0);
/// ```
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert a distance from kilometers to nautical miles.
pub fn km_to_nautical_miles(km: f64) -> f64 {
    km * KM_TO_NAUTICAL_MILES
}
