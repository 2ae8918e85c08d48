use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

// Database entity models

/// A charter booking joined with the customer and captain identity the
/// alert email needs. The `weather_*` columns are owned exclusively by this
/// service; everything else is read-only here.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Booking {
    pub id: i64,
    pub user_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub captain_name: String,
    pub departure_location: String,
    pub trip_date: DateTime<Utc>,
    pub status: String,
    pub weather_alert_sent: bool,
    pub last_weather_check: Option<DateTime<Utc>>,
    pub weather_alert_level: Option<String>,
    pub weather_conditions: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of one dispatched alert, keyed by
/// (booking_id, observed_at).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WeatherAlert {
    pub id: i64,
    pub booking_id: i64,
    pub user_id: String,
    pub level: String,
    pub wind_speed_knots: f64,
    pub wind_gust_knots: f64,
    pub wave_height_feet: f64,
    pub visibility_nm: f64,
    pub air_pressure_hpa: f64,
    pub message: String,
    pub recommendations: serde_json::Value,
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insert-side shape of a weather alert (before the row gets its id and
/// created_at). Mirrors the fetcher-vs-entity split used for readings.
#[derive(Debug, Clone, Serialize)]
pub struct NewWeatherAlert {
    pub booking_id: i64,
    pub user_id: String,
    pub level: String,
    pub wind_speed_knots: f64,
    pub wind_gust_knots: f64,
    pub wave_height_feet: f64,
    pub visibility_nm: f64,
    pub air_pressure_hpa: f64,
    pub message: String,
    pub recommendations: serde_json::Value,
    pub observed_at: DateTime<Utc>,
}
