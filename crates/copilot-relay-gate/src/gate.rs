use copilot_relay_core::RateLimitPolicy;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::{ApprovalChannel, ApprovalOutcome, GateError, RequestDescriptor};

/// Result of the rate-limit stage for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Admitted; forward the request.
    Allow,
    /// Not admitted; surface the error to the client.
    Deny(GateError),
    /// Admitted by the rate limiter but waiting on an operator decision.
    PendingApproval,
}

/// Outcome of comparing the last admission with the policy interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateCheck {
    Allowed,
    Throttled { remaining: Duration },
}

impl RateCheck {
    pub fn evaluate(policy: &RateLimitPolicy, last_admitted: Option<Instant>, now: Instant) -> Self {
        let (Some(interval), Some(last)) = (policy.interval, last_admitted) else {
            return RateCheck::Allowed;
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed < interval {
            RateCheck::Throttled {
                remaining: interval - elapsed,
            }
        } else {
            RateCheck::Allowed
        }
    }
}

struct ManualApproval {
    channel: Arc<dyn ApprovalChannel>,
    timeout: Duration,
}

/// Rate limiter and approval state machine shared by all request handlers.
///
/// `last_admitted` is locked for the whole rate check, including a wait for
/// the interval to elapse, so waiters are admitted one at a time. The lock is
/// released before the approval stage, which never blocks other requests.
pub struct AdmissionGate {
    policy: RateLimitPolicy,
    last_admitted: Mutex<Option<Instant>>,
    approval: Option<ManualApproval>,
}

impl AdmissionGate {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            last_admitted: Mutex::new(None),
            approval: None,
        }
    }

    /// Require an operator decision for every admitted request.
    pub fn with_approval(mut self, channel: Arc<dyn ApprovalChannel>, timeout: Duration) -> Self {
        self.approval = Some(ManualApproval { channel, timeout });
        self
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    pub fn requires_approval(&self) -> bool {
        self.approval.is_some()
    }

    pub async fn last_admitted(&self) -> Option<Instant> {
        *self.last_admitted.lock().await
    }

    /// Run the full admission sequence for one request.
    ///
    /// Dropping the returned future while it waits leaves `last_admitted`
    /// untouched.
    pub async fn admit(&self, descriptor: &RequestDescriptor) -> Result<(), GateError> {
        match self.check_rate_limit(descriptor).await {
            AdmissionDecision::Allow => Ok(()),
            AdmissionDecision::Deny(err) => Err(err),
            AdmissionDecision::PendingApproval => self.await_approval(descriptor).await,
        }
    }

    /// Rate-limit stage only. Records the admission when the request passes.
    pub async fn check_rate_limit(&self, descriptor: &RequestDescriptor) -> AdmissionDecision {
        let mut last_admitted = self.last_admitted.lock().await;

        if let RateCheck::Throttled { remaining } =
            RateCheck::evaluate(&self.policy, *last_admitted, Instant::now())
        {
            if !self.policy.wait_on_limit {
                warn!(
                    request_id = %descriptor.id,
                    endpoint = %descriptor.endpoint,
                    retry_after_ms = remaining.as_millis() as u64,
                    "rate limit exceeded"
                );
                return AdmissionDecision::Deny(GateError::RateLimitExceeded {
                    retry_after: remaining,
                });
            }

            info!(
                request_id = %descriptor.id,
                wait_ms = remaining.as_millis() as u64,
                "rate limited, waiting"
            );
            tokio::time::sleep(remaining).await;
        }

        *last_admitted = Some(Instant::now());
        drop(last_admitted);

        if self.approval.is_some() {
            AdmissionDecision::PendingApproval
        } else {
            AdmissionDecision::Allow
        }
    }

    async fn await_approval(&self, descriptor: &RequestDescriptor) -> Result<(), GateError> {
        let Some(manual) = &self.approval else {
            return Ok(());
        };

        debug!(request_id = %descriptor.id, "awaiting manual approval");

        match tokio::time::timeout(manual.timeout, manual.channel.request_approval(descriptor))
            .await
        {
            Ok(ApprovalOutcome::Approved) => {
                info!(request_id = %descriptor.id, "request approved");
                Ok(())
            }
            Ok(ApprovalOutcome::Rejected) => {
                warn!(request_id = %descriptor.id, "request rejected");
                Err(GateError::RequestDenied)
            }
            Err(_) => {
                warn!(
                    request_id = %descriptor.id,
                    timeout_secs = manual.timeout.as_secs(),
                    "approval timed out"
                );
                Err(GateError::ApprovalTimedOut {
                    timeout: manual.timeout,
                })
            }
        }
    }
}
