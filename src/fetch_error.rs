#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Unexpected HTTP status: {0}")]
    Status(reqwest::StatusCode),
    #[error("Failed to parse buoy data")]
    ParseError,
    #[error("Failed to parse observation time: {0}")]
    DateTimeError(String),
    #[error("Failed to parse number: {0}")]
    NumberError(String),
}
