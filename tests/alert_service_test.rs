// Evaluation pass tests against in-memory fakes of the store, mail, and
// telemetry seams. No database or network required.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use weather_alert_service::classifier::HazardThresholds;
use weather_alert_service::db::{Booking, DbError, NewWeatherAlert};
use weather_alert_service::fetcher::{BuoyReading, TelemetrySource};
use weather_alert_service::notifier::{MailSender, NotifyError};
use weather_alert_service::services::alert_service::{
    AlertService, AlertStore, BookingStore, PassConfig,
};
use weather_alert_service::stations::StationRegistry;

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 27, 12, 0, 0).unwrap()
}

fn booking(id: i64, location: &str, hours_out: i64) -> Booking {
    Booking {
        id,
        user_id: format!("user-{}", id),
        customer_name: format!("Customer {}", id),
        customer_email: format!("customer{}@example.com", id),
        captain_name: "Alvarez".to_string(),
        departure_location: location.to_string(),
        trip_date: fixed_now() + Duration::hours(hours_out),
        status: "confirmed".to_string(),
        weather_alert_sent: false,
        last_weather_check: None,
        weather_alert_level: None,
        weather_conditions: None,
        created_at: fixed_now() - Duration::days(7),
    }
}

fn rough_reading() -> BuoyReading {
    BuoyReading {
        station_id: "unset".to_string(),
        wind_speed_knots: 30.0,
        wind_gust_knots: 36.0,
        wave_height_feet: 7.0,
        wave_period_seconds: 9.0,
        air_pressure_hpa: 1004.0,
        visibility_nm: 8.0,
        air_temp_f: 66.0,
        water_temp_f: 64.0,
        observed_at: fixed_now() - Duration::minutes(10),
        degraded: false,
    }
}

fn calm_reading() -> BuoyReading {
    BuoyReading {
        wind_speed_knots: 6.0,
        wind_gust_knots: 8.0,
        wave_height_feet: 1.5,
        ..rough_reading()
    }
}

#[derive(Clone)]
struct FakeTelemetry {
    reading: BuoyReading,
    requests: Arc<Mutex<Vec<String>>>,
}

impl FakeTelemetry {
    fn new(reading: BuoyReading) -> Self {
        Self {
            reading,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn requested_stations(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelemetrySource for FakeTelemetry {
    async fn fetch_reading(&self, station_id: &str) -> BuoyReading {
        self.requests.lock().unwrap().push(station_id.to_string());
        BuoyReading {
            station_id: station_id.to_string(),
            ..self.reading.clone()
        }
    }
}

#[derive(Clone, Default)]
struct FakeBookings {
    rows: Arc<Mutex<Vec<Booking>>>,
    fail_query: Arc<AtomicBool>,
}

impl FakeBookings {
    fn with(bookings: Vec<Booking>) -> Self {
        Self {
            rows: Arc::new(Mutex::new(bookings)),
            fail_query: Arc::new(AtomicBool::new(false)),
        }
    }

    fn get(&self, id: i64) -> Booking {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .expect("booking not found")
    }
}

#[async_trait]
impl BookingStore for FakeBookings {
    async fn eligible_bookings(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<Booking>, DbError> {
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(DbError::SqlxError(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|b| {
                b.status == "confirmed"
                    && !b.weather_alert_sent
                    && b.trip_date >= window_start
                    && b.trip_date < window_end
            })
            .cloned()
            .collect())
    }

    async fn record_check(
        &self,
        booking_id: i64,
        level: &str,
        conditions: &serde_json::Value,
        checked_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.iter_mut().find(|b| b.id == booking_id) {
            row.last_weather_check = Some(checked_at);
            row.weather_alert_level = Some(level.to_string());
            row.weather_conditions = Some(conditions.clone());
        }
        Ok(())
    }

    async fn mark_alert_sent(&self, booking_id: i64) -> Result<bool, DbError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows
            .iter_mut()
            .find(|b| b.id == booking_id && !b.weather_alert_sent)
        {
            row.weather_alert_sent = true;
            return Ok(true);
        }
        Ok(false)
    }
}

#[derive(Clone, Default)]
struct FakeAlerts {
    appended: Arc<Mutex<Vec<NewWeatherAlert>>>,
}

#[async_trait]
impl AlertStore for FakeAlerts {
    async fn append(&self, alert: &NewWeatherAlert) -> Result<(), DbError> {
        self.appended.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakeMailer {
    sent: Arc<Mutex<Vec<(String, String)>>>,
    fail: Arc<AtomicBool>,
}

#[async_trait]
impl MailSender for FakeMailer {
    async fn send(
        &self,
        to_email: &str,
        subject: &str,
        _html_body: &str,
    ) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Status(reqwest::StatusCode::BAD_GATEWAY));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to_email.to_string(), subject.to_string()));
        Ok(())
    }
}

fn service(
    telemetry: FakeTelemetry,
    bookings: FakeBookings,
    alerts: FakeAlerts,
    mailer: FakeMailer,
) -> AlertService<FakeTelemetry, FakeBookings, FakeAlerts, FakeMailer> {
    AlertService::new(
        telemetry,
        bookings,
        alerts,
        mailer,
        StationRegistry::socal(),
        HazardThresholds::default(),
        PassConfig::default(),
    )
}

#[tokio::test]
async fn test_dangerous_conditions_send_one_alert() {
    let bookings = FakeBookings::with(vec![booking(1, "San Diego", 6)]);
    let alerts = FakeAlerts::default();
    let mailer = FakeMailer::default();
    let svc = service(
        FakeTelemetry::new(rough_reading()),
        bookings.clone(),
        alerts.clone(),
        mailer.clone(),
    );

    let summary = svc.run_pass(fixed_now()).await.unwrap();

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.alerts_sent, 1);
    assert_eq!(summary.send_failures, 0);
    assert_eq!(summary.booking_errors, 0);

    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "customer1@example.com");
    assert!(sent[0].1.contains("DANGER"));

    let updated = bookings.get(1);
    assert!(updated.weather_alert_sent);
    assert_eq!(updated.weather_alert_level.as_deref(), Some("danger"));
    assert!(updated.last_weather_check.is_some());

    let appended = alerts.appended.lock().unwrap();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].booking_id, 1);
    assert_eq!(appended[0].level, "danger");
    assert_eq!(appended[0].wind_speed_knots, 30.0);
}

#[tokio::test]
async fn test_second_pass_does_not_double_send() {
    let bookings = FakeBookings::with(vec![booking(1, "San Diego", 6)]);
    let mailer = FakeMailer::default();
    let svc = service(
        FakeTelemetry::new(rough_reading()),
        bookings.clone(),
        FakeAlerts::default(),
        mailer.clone(),
    );

    svc.run_pass(fixed_now()).await.unwrap();
    let second = svc.run_pass(fixed_now()).await.unwrap();

    // The flag set by the first pass removes the booking from eligibility
    assert_eq!(second.evaluated, 0);
    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_safe_conditions_record_check_without_email() {
    let bookings = FakeBookings::with(vec![booking(1, "San Diego", 6)]);
    let alerts = FakeAlerts::default();
    let mailer = FakeMailer::default();
    let svc = service(
        FakeTelemetry::new(calm_reading()),
        bookings.clone(),
        alerts.clone(),
        mailer.clone(),
    );

    let summary = svc.run_pass(fixed_now()).await.unwrap();

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.alerts_sent, 0);
    assert!(mailer.sent.lock().unwrap().is_empty());
    assert!(alerts.appended.lock().unwrap().is_empty());

    let updated = bookings.get(1);
    assert!(!updated.weather_alert_sent);
    assert_eq!(updated.weather_alert_level.as_deref(), Some("safe"));
    assert!(updated.last_weather_check.is_some());
    assert!(updated.weather_conditions.is_some());
}

#[tokio::test]
async fn test_failed_send_leaves_booking_eligible_for_retry() {
    let bookings = FakeBookings::with(vec![booking(1, "San Diego", 6)]);
    let alerts = FakeAlerts::default();
    let mailer = FakeMailer::default();
    mailer.fail.store(true, Ordering::SeqCst);

    let svc = service(
        FakeTelemetry::new(rough_reading()),
        bookings.clone(),
        alerts.clone(),
        mailer.clone(),
    );

    let summary = svc.run_pass(fixed_now()).await.unwrap();
    assert_eq!(summary.send_failures, 1);
    assert_eq!(summary.alerts_sent, 0);
    assert!(!bookings.get(1).weather_alert_sent);
    assert!(alerts.appended.lock().unwrap().is_empty());

    // Mail service recovers; the next scheduled pass picks the booking up
    mailer.fail.store(false, Ordering::SeqCst);
    let retry = svc.run_pass(fixed_now()).await.unwrap();
    assert_eq!(retry.alerts_sent, 1);
    assert!(bookings.get(1).weather_alert_sent);
    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_store_unreachable_is_fatal_for_the_pass() {
    let bookings = FakeBookings::with(vec![booking(1, "San Diego", 6)]);
    bookings.fail_query.store(true, Ordering::SeqCst);

    let svc = service(
        FakeTelemetry::new(rough_reading()),
        bookings,
        FakeAlerts::default(),
        FakeMailer::default(),
    );

    assert!(svc.run_pass(fixed_now()).await.is_err());
}

#[tokio::test]
async fn test_already_alerted_and_out_of_window_bookings_excluded() {
    let mut alerted = booking(1, "San Diego", 6);
    alerted.weather_alert_sent = true;
    let mut pending = booking(2, "San Diego", 6);
    pending.status = "pending".to_string();
    let far_out = booking(3, "San Diego", 48);
    let past = booking(4, "San Diego", -2);
    let eligible = booking(5, "San Diego", 23);

    let bookings = FakeBookings::with(vec![alerted, pending, far_out, past, eligible]);
    let mailer = FakeMailer::default();
    let svc = service(
        FakeTelemetry::new(rough_reading()),
        bookings.clone(),
        FakeAlerts::default(),
        mailer.clone(),
    );

    let summary = svc.run_pass(fixed_now()).await.unwrap();

    assert_eq!(summary.evaluated, 1);
    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "customer5@example.com");
}

#[tokio::test]
async fn test_station_fetches_deduplicated_across_bookings() {
    let bookings = FakeBookings::with(vec![
        booking(1, "San Diego", 4),
        booking(2, "Point Loma fuel dock", 8),
        booking(3, "Oceanside", 12),
    ]);
    let telemetry = FakeTelemetry::new(calm_reading());
    let svc = service(
        telemetry.clone(),
        bookings,
        FakeAlerts::default(),
        FakeMailer::default(),
    );

    let summary = svc.run_pass(fixed_now()).await.unwrap();
    assert_eq!(summary.evaluated, 3);

    // Bookings 1 and 2 both resolve to Point Loma South; one fetch each for
    // the two distinct stations
    let mut stations = telemetry.requested_stations();
    stations.sort();
    assert_eq!(stations, vec!["46224".to_string(), "46232".to_string()]);
}

#[tokio::test]
async fn test_degraded_telemetry_never_alerts() {
    let degraded = BuoyReading::degraded("46232", fixed_now());
    let bookings = FakeBookings::with(vec![booking(1, "San Diego", 6)]);
    let mailer = FakeMailer::default();
    let svc = service(
        FakeTelemetry::new(degraded),
        bookings.clone(),
        FakeAlerts::default(),
        mailer.clone(),
    );

    let summary = svc.run_pass(fixed_now()).await.unwrap();

    assert_eq!(summary.evaluated, 1);
    assert_eq!(summary.alerts_sent, 0);
    assert!(mailer.sent.lock().unwrap().is_empty());
    assert_eq!(bookings.get(1).weather_alert_level.as_deref(), Some("safe"));
}
