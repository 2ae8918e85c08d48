use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use crate::db::{Booking, DbError};
use crate::services::alert_service::BookingStore;

#[derive(Clone)]
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for BookingRepository {
    /// Confirmed bookings departing inside the look-ahead window that have
    /// not yet been alerted for the current hazard episode.
    #[instrument(skip(self))]
    async fn eligible_bookings(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, DbError> {
        debug!(
            "Querying eligible bookings from {} to {}",
            window_start, window_end
        );

        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT id, user_id, customer_name, customer_email, captain_name,
                   departure_location, trip_date, status, weather_alert_sent,
                   last_weather_check, weather_alert_level, weather_conditions,
                   created_at
            FROM bookings
            WHERE status = 'confirmed'
              AND trip_date >= $1
              AND trip_date < $2
              AND weather_alert_sent = FALSE
            ORDER BY trip_date
            "#,
        )
        .bind(window_start)
        .bind(window_end)
        .fetch_all(&self.pool)
        .await?;

        debug!("Found {} eligible bookings", bookings.len());
        Ok(bookings)
    }

    /// Write-through of the evaluation result, performed on every check
    /// whether or not an alert goes out.
    #[instrument(skip(self, conditions), fields(booking_id = %booking_id, level = %level))]
    async fn record_check(
        &self,
        booking_id: i64,
        level: &str,
        conditions: &serde_json::Value,
        checked_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET last_weather_check = $2,
                weather_alert_level = $3,
                weather_conditions = $4
            WHERE id = $1
            "#,
        )
        .bind(booking_id)
        .bind(checked_at)
        .bind(level)
        .bind(conditions)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Conditional flag write: flips `weather_alert_sent` only if it is
    /// currently false, so two concurrent passes cannot both claim the send.
    /// Returns whether this call won the flag.
    #[instrument(skip(self), fields(booking_id = %booking_id))]
    async fn mark_alert_sent(&self, booking_id: i64) -> Result<bool, DbError> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET weather_alert_sent = TRUE
            WHERE id = $1 AND weather_alert_sent = FALSE
            "#,
        )
        .bind(booking_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
