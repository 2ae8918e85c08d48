use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub buoy_base_url: String,
    pub mail_api_url: String,
    pub mail_api_key: String,
    pub mail_from_address: String,
    pub evaluation_interval_minutes: u64,
    pub lookahead_hours: i64,
    pub fetch_concurrency: usize,
    pub fetch_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            buoy_base_url: env::var("BUOY_BASE_URL")
                .unwrap_or_else(|_| "https://www.ndbc.noaa.gov".to_string()),
            mail_api_url: env::var("MAIL_API_URL")?,
            mail_api_key: env::var("MAIL_API_KEY")?,
            mail_from_address: env::var("MAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| "alerts@charterwatch.example".to_string()),
            evaluation_interval_minutes: env::var("EVALUATION_INTERVAL_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap_or(60),
            lookahead_hours: env::var("LOOKAHEAD_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            fetch_concurrency: env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            fetch_timeout_secs: env::var("FETCH_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}
