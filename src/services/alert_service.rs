use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::classifier::{classify, HazardLevel, HazardThresholds};
use crate::db::{Booking, DbError, NewWeatherAlert};
use crate::fetcher::{BuoyReading, TelemetrySource};
use crate::notifier::{render_alert_email, MailSender};
use crate::stations::StationRegistry;

/// Read side of the booking store, narrowed to exactly what one evaluation
/// pass needs so tests can run against in-memory fakes.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn eligible_bookings(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, DbError>;

    async fn record_check(
        &self,
        booking_id: i64,
        level: &str,
        conditions: &serde_json::Value,
        checked_at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    /// Conditional write: returns true only if this call flipped the flag.
    async fn mark_alert_sent(&self, booking_id: i64) -> Result<bool, DbError>;
}

/// Append-only alert history.
#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn append(&self, alert: &NewWeatherAlert) -> Result<(), DbError>;
}

/// Result roll-up of one evaluation pass.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PassSummary {
    pub evaluated: usize,
    pub alerts_sent: usize,
    pub send_failures: usize,
    pub booking_errors: usize,
}

/// Only the failure to even load the eligible set aborts a pass; everything
/// downstream is handled per booking.
#[derive(Debug, thiserror::Error)]
pub enum PassError {
    #[error("Failed to load eligible bookings: {0}")]
    BookingQuery(#[from] DbError),
}

#[derive(Debug, Clone)]
pub struct PassConfig {
    pub lookahead_hours: i64,
    pub fetch_concurrency: usize,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            lookahead_hours: 24,
            fetch_concurrency: 5,
        }
    }
}

enum BookingOutcome {
    Checked,
    AlertSent,
    SendFailed,
    Errored,
}

/// Orchestrates one evaluation pass: eligible bookings in, checks recorded
/// and at most one alert email out per booking per hazard episode.
pub struct AlertService<T, B, A, M> {
    telemetry: T,
    bookings: B,
    alerts: A,
    mailer: M,
    stations: StationRegistry,
    thresholds: HazardThresholds,
    config: PassConfig,
}

impl<T, B, A, M> AlertService<T, B, A, M>
where
    T: TelemetrySource,
    B: BookingStore,
    A: AlertStore,
    M: MailSender,
{
    pub fn new(
        telemetry: T,
        bookings: B,
        alerts: A,
        mailer: M,
        stations: StationRegistry,
        thresholds: HazardThresholds,
        config: PassConfig,
    ) -> Self {
        Self {
            telemetry,
            bookings,
            alerts,
            mailer,
            stations,
            thresholds,
            config,
        }
    }

    /// Run one evaluation pass as of `now`. `now` is a parameter rather than
    /// a clock read so schedulers and tests can pin the window.
    #[instrument(skip(self), fields(now = %now))]
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassSummary, PassError> {
        let window_end = now + Duration::hours(self.config.lookahead_hours);
        let bookings = self.bookings.eligible_bookings(now, window_end).await?;
        info!(count = bookings.len(), "Starting weather evaluation pass");

        if bookings.is_empty() {
            return Ok(PassSummary::default());
        }

        let station_ids: Vec<String> = bookings
            .iter()
            .map(|b| self.stations.resolve(&b.departure_location).to_string())
            .collect();

        // One fetch per involved station, deduplicated across bookings and
        // bounded by the configured concurrency. A failed fetch already
        // degrades inside the telemetry source.
        let mut unique_stations = station_ids.clone();
        unique_stations.sort();
        unique_stations.dedup();

        let readings: HashMap<String, BuoyReading> = stream::iter(unique_stations)
            .map(|station_id| async move {
                let reading = self.telemetry.fetch_reading(&station_id).await;
                (station_id, reading)
            })
            .buffer_unordered(self.config.fetch_concurrency)
            .collect()
            .await;

        let outcomes: Vec<BookingOutcome> = stream::iter(bookings.into_iter().zip(station_ids))
            .map(|(booking, station_id)| {
                let reading = readings
                    .get(&station_id)
                    .cloned()
                    .unwrap_or_else(|| BuoyReading::degraded(&station_id, now));
                self.evaluate_booking(booking, reading, now)
            })
            .buffer_unordered(self.config.fetch_concurrency)
            .collect()
            .await;

        let mut summary = PassSummary {
            evaluated: outcomes.len(),
            ..PassSummary::default()
        };
        for outcome in outcomes {
            match outcome {
                BookingOutcome::Checked => {}
                BookingOutcome::AlertSent => summary.alerts_sent += 1,
                BookingOutcome::SendFailed => summary.send_failures += 1,
                BookingOutcome::Errored => summary.booking_errors += 1,
            }
        }

        info!(
            evaluated = summary.evaluated,
            alerts_sent = summary.alerts_sent,
            send_failures = summary.send_failures,
            booking_errors = summary.booking_errors,
            "Evaluation pass complete"
        );
        Ok(summary)
    }

    /// Per-booking wrapper: any unexpected failure is logged and absorbed so
    /// the rest of the pass continues.
    async fn evaluate_booking(
        &self,
        booking: Booking,
        reading: BuoyReading,
        now: DateTime<Utc>,
    ) -> BookingOutcome {
        let booking_id = booking.id;
        match self.try_evaluate(booking, reading, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(booking_id, error = %e, "Failed to evaluate booking, continuing pass");
                BookingOutcome::Errored
            }
        }
    }

    async fn try_evaluate(
        &self,
        booking: Booking,
        reading: BuoyReading,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome, DbError> {
        let assessment = classify(&reading, &self.thresholds);

        // Write-through on every check, alert or not.
        let conditions = serde_json::to_value(&assessment.triggered_conditions)
            .unwrap_or(serde_json::Value::Null);
        self.bookings
            .record_check(booking.id, assessment.level.as_str(), &conditions, now)
            .await?;

        if assessment.level == HazardLevel::Safe {
            debug!(booking_id = booking.id, "Conditions safe, no alert needed");
            return Ok(BookingOutcome::Checked);
        }

        let (subject, body) = render_alert_email(&booking, &reading, &assessment);
        if let Err(e) = self
            .mailer
            .send(&booking.customer_email, &subject, &body)
            .await
        {
            // Flag stays false; the next scheduled pass retries. No in-pass
            // retry loop.
            warn!(
                booking_id = booking.id,
                error = %e,
                "Alert email failed to send, leaving booking eligible for retry"
            );
            return Ok(BookingOutcome::SendFailed);
        }

        if !self.bookings.mark_alert_sent(booking.id).await? {
            debug!(
                booking_id = booking.id,
                "Alert flag already claimed by another pass, skipping record"
            );
            return Ok(BookingOutcome::Checked);
        }

        self.alerts
            .append(&NewWeatherAlert {
                booking_id: booking.id,
                user_id: booking.user_id.clone(),
                level: assessment.level.as_str().to_string(),
                wind_speed_knots: reading.wind_speed_knots,
                wind_gust_knots: reading.wind_gust_knots,
                wave_height_feet: reading.wave_height_feet,
                visibility_nm: reading.visibility_nm,
                air_pressure_hpa: reading.air_pressure_hpa,
                message: assessment.summary.clone(),
                recommendations: serde_json::to_value(&assessment.recommendations)
                    .unwrap_or(serde_json::Value::Null),
                observed_at: reading.observed_at,
            })
            .await?;

        info!(
            booking_id = booking.id,
            level = %assessment.level,
            station_id = %reading.station_id,
            "Weather alert sent"
        );
        Ok(BookingOutcome::AlertSent)
    }
}

/// Concrete wiring used by the binaries and the ops API.
pub type ProductionAlertService = AlertService<
    crate::fetcher::BuoyFetcher,
    crate::db::BookingRepository,
    crate::db::AlertRepository,
    crate::notifier::HttpMailSender,
>;
