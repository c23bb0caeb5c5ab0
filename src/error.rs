use thiserror::Error;

/// Observable error kinds surfaced by the engine, resolver, and validation
/// pipeline. Kinds drive retry/propagation policy, not formatting.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transient network error: {0}")]
    TransientNetwork(#[source] anyhow::Error),

    #[error("rate limited")]
    RateLimited { cooldown_secs: Option<u64> },

    #[error("server error: HTTP {status}")]
    ServerError { status: u16 },

    #[error("parse error on {item}: {reason}")]
    ParseError { item: String, reason: String },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("resolution error: {0}")]
    ResolutionError(String),

    #[error("database conflict on {constraint}")]
    DbConflict { constraint: String },

    #[error("fatal: {0}")]
    Fatal(#[source] anyhow::Error),
}

impl PipelineError {
    /// True for kinds the engine retries under the adapter's backoff schedule.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PipelineError::TransientNetwork(_)
                | PipelineError::RateLimited { .. }
                | PipelineError::ServerError { .. }
        )
    }
}

/// Classifies an HTTP response status into the error kind that drives the
/// engine's propagation policy. 429 gets its own cooldown-then-retry path
/// that does not count against the attempt ceiling -- the cooldown itself
/// is the `Retry-After` value when the response sends one, else the
/// adapter's own configured fallback; 5xx retries under the normal backoff
/// schedule; everything else is left to the caller.
pub fn classify_http_status(status: u16, retry_after_secs: Option<u64>) -> Option<PipelineError> {
    if status == 429 {
        Some(PipelineError::RateLimited { cooldown_secs: retry_after_secs })
    } else if (500..600).contains(&status) {
        Some(PipelineError::ServerError { status })
    } else {
        None
    }
}
