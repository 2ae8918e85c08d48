use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::classifier::HazardThresholds;
use crate::config::Config;
use crate::db::{AlertRepository, BookingRepository};
use crate::fetcher::BuoyFetcher;
use crate::notifier::HttpMailSender;
use crate::scheduler;
use crate::services::alert_service::{AlertService, PassConfig, ProductionAlertService};

/// Wire up the production evaluator from config. Shared by the long-running
/// service and the one-shot `run-pass` binary.
pub fn build_alert_service(config: &Config, pool: PgPool) -> ProductionAlertService {
    let timeout = Duration::from_secs(config.fetch_timeout_secs);

    AlertService::new(
        BuoyFetcher::new(config.buoy_base_url.clone(), timeout),
        BookingRepository::new(pool.clone()),
        AlertRepository::new(pool),
        HttpMailSender::new(
            config.mail_api_url.clone(),
            config.mail_api_key.clone(),
            config.mail_from_address.clone(),
            timeout,
        ),
        crate::stations::StationRegistry::socal(),
        HazardThresholds::default(),
        PassConfig {
            lookahead_hours: config.lookahead_hours,
            fetch_concurrency: config.fetch_concurrency,
        },
    )
}

/// Application with the spawned scheduler and HTTP server.
///
/// Holds the task handles so a future graceful-shutdown path can join them;
/// today both run until the process exits.
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pub scheduler_handle: JoinHandle<()>,
}

impl Application {
    pub async fn build(config: Config, pool: PgPool) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let alert_service = Arc::new(build_alert_service(&config, pool.clone()));
        let alert_repo = AlertRepository::new(pool);

        let scheduler_handle = {
            let service = alert_service.clone();
            let interval = config.evaluation_interval_minutes;

            tokio::spawn(async move {
                scheduler::start_evaluation_scheduler(service, interval).await;
            })
        };

        let app_state = AppState {
            alert_service,
            alert_repo,
        };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await
        });

        info!("Application initialized successfully");

        Ok(Self {
            server_handle,
            scheduler_handle,
        })
    }

    /// Run until the server stops (which runs indefinitely unless error).
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
