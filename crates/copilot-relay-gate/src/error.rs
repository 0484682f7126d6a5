use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("Rate limit exceeded, retry after {}s", retry_after.as_secs_f64().ceil())]
    RateLimitExceeded { retry_after: Duration },

    #[error("Request denied by the operator")]
    RequestDenied,

    #[error("No approval decision within {}s", timeout.as_secs())]
    ApprovalTimedOut { timeout: Duration },
}

impl GateError {
    /// Whole seconds a client should wait, for a `retry-after` header.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            GateError::RateLimitExceeded { retry_after } => {
                Some(retry_after.as_secs_f64().ceil() as u64)
            }
            _ => None,
        }
    }
}
