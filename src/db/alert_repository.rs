use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{DbError, NewWeatherAlert, WeatherAlert};
use crate::services::alert_service::AlertStore;

#[derive(Clone)]
pub struct AlertRepository {
    pool: PgPool,
}

impl AlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recent alerts across all bookings, newest first.
    #[instrument(skip(self))]
    pub async fn find_recent(&self, limit: i64) -> Result<Vec<WeatherAlert>, DbError> {
        let alerts = sqlx::query_as::<_, WeatherAlert>(
            r#"
            SELECT id, booking_id, user_id, level, wind_speed_knots,
                   wind_gust_knots, wave_height_feet, visibility_nm,
                   air_pressure_hpa, message, recommendations, observed_at,
                   created_at
            FROM weather_alerts
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} recent alerts", alerts.len());
        Ok(alerts)
    }

    /// Alert history for one booking, oldest first.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    pub async fn find_by_booking(&self, booking_id: i64) -> Result<Vec<WeatherAlert>, DbError> {
        let alerts = sqlx::query_as::<_, WeatherAlert>(
            r#"
            SELECT id, booking_id, user_id, level, wind_speed_knots,
                   wind_gust_knots, wave_height_feet, visibility_nm,
                   air_pressure_hpa, message, recommendations, observed_at,
                   created_at
            FROM weather_alerts
            WHERE booking_id = $1
            ORDER BY observed_at
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(alerts)
    }
}

#[async_trait]
impl AlertStore for AlertRepository {
    /// Append-only insert; a duplicate (booking_id, observed_at) pair means
    /// the same observation already produced an alert and is skipped.
    #[instrument(skip(self, alert), fields(booking_id = %alert.booking_id, level = %alert.level))]
    async fn append(&self, alert: &NewWeatherAlert) -> Result<(), DbError> {
        sqlx::query(
            r#"
            INSERT INTO weather_alerts (booking_id, user_id, level,
                wind_speed_knots, wind_gust_knots, wave_height_feet,
                visibility_nm, air_pressure_hpa, message, recommendations,
                observed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (booking_id, observed_at) DO NOTHING
            "#,
        )
        .bind(alert.booking_id)
        .bind(&alert.user_id)
        .bind(&alert.level)
        .bind(alert.wind_speed_knots)
        .bind(alert.wind_gust_knots)
        .bind(alert.wave_height_feet)
        .bind(alert.visibility_nm)
        .bind(alert.air_pressure_hpa)
        .bind(&alert.message)
        .bind(&alert.recommendations)
        .bind(alert.observed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
