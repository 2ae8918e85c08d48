use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tracing::{debug, error, info, instrument};

use crate::fetcher::TelemetrySource;
use crate::notifier::MailSender;
use crate::services::alert_service::{AlertService, AlertStore, BookingStore};

/// Hourly (by default) evaluation loop. Each tick runs one pass with the
/// current wall clock; a failed pass is logged and the loop keeps going.
#[instrument(skip(service), fields(interval_minutes = %interval_minutes))]
pub async fn start_evaluation_scheduler<T, B, A, M>(
    service: Arc<AlertService<T, B, A, M>>,
    interval_minutes: u64,
) where
    T: TelemetrySource,
    B: BookingStore,
    A: AlertStore,
    M: MailSender,
{
    let mut interval = time::interval(Duration::from_secs(interval_minutes * 60));

    info!(
        "Evaluation scheduler started with {} minute interval",
        interval_minutes
    );

    loop {
        interval.tick().await;
        debug!("Scheduler tick, starting evaluation pass");

        match service.run_pass(Utc::now()).await {
            Ok(summary) => {
                if summary.alerts_sent > 0 || summary.send_failures > 0 {
                    info!(
                        evaluated = summary.evaluated,
                        alerts_sent = summary.alerts_sent,
                        send_failures = summary.send_failures,
                        "Scheduled pass finished"
                    );
                } else {
                    debug!(evaluated = summary.evaluated, "Scheduled pass finished, no alerts");
                }
            }
            Err(e) => {
                error!(error = %e, "Evaluation pass failed");
            }
        }
    }
}
