use thiserror::Error;

#[derive(Error, Debug)]
pub enum CroscopeError {
    #[error("Collection error: {0}")]
    Collection(String),

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Analysis deadline exceeded after {0}ms")]
    DeadlineExceeded(u64),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
