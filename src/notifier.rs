use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::classifier::HazardAssessment;
use crate::db::Booking;
use crate::fetcher::BuoyReading;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Mail request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Mail API returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Narrow transactional-mail capability. The dispatcher only needs
/// "send this HTML to this address and tell me whether it worked".
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, to_email: &str, subject: &str, html_body: &str)
        -> Result<(), NotifyError>;
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Mail sender backed by a JSON-over-HTTP transactional mail API.
#[derive(Clone)]
pub struct HttpMailSender {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from_address: String,
    timeout: Duration,
}

impl HttpMailSender {
    pub fn new(api_url: String, api_key: String, from_address: String, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            from_address,
            timeout,
        }
    }
}

#[async_trait]
impl MailSender for HttpMailSender {
    #[instrument(skip(self, html_body), fields(to_email = %to_email, subject = %subject))]
    async fn send(
        &self,
        to_email: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotifyError> {
        debug!("Sending alert email via mail API");

        let request = MailRequest {
            from: &self.from_address,
            to: to_email,
            subject,
            html: html_body,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await?;

        debug!("Mail API responded with status: {}", response.status());
        if !response.status().is_success() {
            return Err(NotifyError::Status(response.status()));
        }

        Ok(())
    }
}

/// Minimal HTML escape for booking-sourced text. Telemetry numbers are
/// formatted internally and need no escaping.
fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the alert email for one booking. Returns (subject, html body).
///
/// Subject carries the hazard level and trip date; the body carries the four
/// headline metrics, the recommendation list, and who the alert concerns.
pub fn render_alert_email(
    booking: &Booking,
    reading: &BuoyReading,
    assessment: &HazardAssessment,
) -> (String, String) {
    let trip_date = booking.trip_date.format("%B %e, %Y");
    let subject = format!(
        "{} weather alert for your charter trip on {}",
        assessment.level.headline(),
        trip_date
    );

    let mut body = String::new();
    body.push_str(&format!(
        "<h2>Weather {} for your upcoming trip</h2>",
        assessment.level.headline()
    ));
    body.push_str(&format!("<p>{}</p>", assessment.summary));

    body.push_str("<h3>Current conditions</h3><ul>");
    body.push_str(&format!(
        "<li>Wind: {:.0} kt, gusting {:.0} kt</li>",
        reading.wind_speed_knots, reading.wind_gust_knots
    ));
    body.push_str(&format!(
        "<li>Seas: {:.1} ft at {:.0} s</li>",
        reading.wave_height_feet, reading.wave_period_seconds
    ));
    body.push_str(&format!(
        "<li>Visibility: {:.1} nm</li>",
        reading.visibility_nm
    ));
    body.push_str(&format!(
        "<li>Barometric pressure: {:.1} hPa</li>",
        reading.air_pressure_hpa
    ));
    body.push_str("</ul>");

    if !assessment.triggered_conditions.is_empty() {
        body.push_str("<h3>Flagged conditions</h3><ul>");
        for condition in &assessment.triggered_conditions {
            body.push_str(&format!("<li>{}</li>", condition.message));
        }
        body.push_str("</ul>");
    }

    body.push_str("<h3>Our recommendations</h3><ul>");
    for recommendation in &assessment.recommendations {
        body.push_str(&format!("<li>{}</li>", recommendation));
    }
    body.push_str("</ul>");

    body.push_str(&format!(
        "<p>Booking #{} for {} departing {} on {} with Captain {}.</p>",
        booking.id,
        escape_html(&booking.customer_name),
        escape_html(&booking.departure_location),
        trip_date,
        escape_html(&booking.captain_name)
    ));
    body.push_str(&format!(
        "<p><small>Based on buoy station {} observed at {} UTC.</small></p>",
        reading.station_id,
        reading.observed_at.format("%Y-%m-%d %H:%M")
    ));

    (subject, body)
}
