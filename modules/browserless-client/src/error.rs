use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Render timed out after {0}ms")]
    Timeout(u64),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl BrowserlessError {
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            BrowserlessError::Timeout(timeout_ms)
        } else {
            BrowserlessError::Network(err.to_string())
        }
    }
}
