use thiserror::Error;

/// Failures local to a single fit or predict call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("design matrix is singular (X'X not invertible)")]
    SingularMatrix,

    #[error("non-finite value: {0}")]
    NonFinite(String),

    #[error("dimension mismatch: expected {expected}, got {got}")]
    Dimension { expected: usize, got: usize },

    #[error("model has not been fitted")]
    NotFitted,
}

/// Failures reaching or reading the market-data provider.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    #[error("upstream error (code {code:?}): {message}")]
    Upstream { code: Option<i64>, message: String },
}

impl FeedError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() || e.is_request() {
            Self::TransientNetwork(e.to_string())
        } else {
            Self::Upstream {
                code: e.status().map(|s| s.as_u16() as i64),
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        Self::Upstream {
            code: None,
            message: format!("malformed payload: {}", e),
        }
    }
}

/// Fatal session failure, tagged with the stage that failed.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("init stage failed: {0:#}")]
    Init(anyhow::Error),

    #[error("fit stage failed: {0}")]
    Fit(#[source] ModelError),

    #[error("predict stage failed: {0}")]
    Predict(#[source] ModelError),

    #[error("feed stage failed: {0}")]
    Feed(#[source] FeedError),

    #[error("log sink failed: {0:#}")]
    Sink(anyhow::Error),
}
