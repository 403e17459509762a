use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("review source error: {0}")]
    Source(String),

    #[error("rate limited by GitHub: {0}")]
    RateLimited(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid thread key: {0} (expected owner/repo#N or a pull request URL)")]
    InvalidThreadKey(String),

    #[error("no pull request selected: {0}")]
    NoThreadSelected(String),

    #[error("output error: {0}")]
    Output(String),

    #[error("{failed} of {total} review(s) failed; first: {first}")]
    ReportsFailed {
        failed: usize,
        total: usize,
        first: String,
    },

    #[error("task error: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;
