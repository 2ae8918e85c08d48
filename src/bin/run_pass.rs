use chrono::{DateTime, Utc};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use weather_alert_service::app::build_alert_service;
use weather_alert_service::config::Config;

/// Run a single weather evaluation pass and exit. Intended for external
/// cron-style schedulers; the long-running service runs its own loop.
#[derive(Parser)]
#[command(name = "run-pass")]
#[command(about = "Run one weather evaluation pass over eligible bookings", long_about = None)]
struct Cli {
    /// Evaluate the booking window as of this instant (RFC 3339) instead of
    /// the current time
    #[arg(long)]
    now: Option<DateTime<Utc>>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    let service = build_alert_service(&config, pool);
    let now = cli.now.unwrap_or_else(Utc::now);

    let summary = service.run_pass(now).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
