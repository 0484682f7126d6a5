//! Admission sequencing on paused tokio time.

use async_trait::async_trait;
use copilot_relay_core::RateLimitPolicy;
use copilot_relay_gate::{
    AdmissionGate, ApprovalChannel, ApprovalOutcome, GateError, QueuedApprovals,
    RequestDescriptor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const INTERVAL: Duration = Duration::from_secs(10);

fn request() -> RequestDescriptor {
    RequestDescriptor::new("/v1/messages", Some("claude-sonnet-4".to_string()), 1)
}

struct FixedDecision {
    outcome: ApprovalOutcome,
    asked: AtomicUsize,
}

impl FixedDecision {
    fn new(outcome: ApprovalOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            asked: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ApprovalChannel for FixedDecision {
    async fn request_approval(&self, _descriptor: &RequestDescriptor) -> ApprovalOutcome {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }
}

#[tokio::test(start_paused = true)]
async fn test_second_request_within_interval_is_rejected() {
    let gate = AdmissionGate::new(RateLimitPolicy::every(INTERVAL, false));

    gate.admit(&request()).await.unwrap();
    tokio::time::advance(Duration::from_secs(4)).await;

    let err = gate.admit(&request()).await.unwrap_err();
    assert_eq!(
        err,
        GateError::RateLimitExceeded {
            retry_after: Duration::from_secs(6)
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_requests_an_interval_apart_both_succeed() {
    let gate = AdmissionGate::new(RateLimitPolicy::every(INTERVAL, false));

    gate.admit(&request()).await.unwrap();
    tokio::time::advance(INTERVAL).await;
    gate.admit(&request()).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_rejected_request_does_not_move_the_window() {
    let gate = AdmissionGate::new(RateLimitPolicy::every(INTERVAL, false));

    gate.admit(&request()).await.unwrap();
    let first = gate.last_admitted().await.unwrap();

    tokio::time::advance(Duration::from_secs(9)).await;
    assert!(gate.admit(&request()).await.is_err());
    assert_eq!(gate.last_admitted().await, Some(first));

    tokio::time::advance(Duration::from_secs(1)).await;
    gate.admit(&request()).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_waiting_request_is_admitted_after_the_interval() {
    let gate = AdmissionGate::new(RateLimitPolicy::every(INTERVAL, true));

    let start = Instant::now();
    gate.admit(&request()).await.unwrap();
    gate.admit(&request()).await.unwrap();

    assert!(start.elapsed() >= INTERVAL);
    assert!(gate.last_admitted().await.unwrap() >= start + INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_waiters_are_admitted_one_interval_apart() {
    let gate = Arc::new(AdmissionGate::new(RateLimitPolicy::every(INTERVAL, true)));
    let start = Instant::now();

    let admit = |gate: Arc<AdmissionGate>| async move {
        gate.admit(&request()).await.unwrap();
        Instant::now()
    };

    let (a, b, c) = tokio::join!(
        admit(gate.clone()),
        admit(gate.clone()),
        admit(gate.clone())
    );

    let mut admitted = vec![a, b, c];
    admitted.sort();
    assert_eq!(admitted[0], start);
    assert!(admitted[1] - admitted[0] >= INTERVAL);
    assert!(admitted[2] - admitted[1] >= INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_waiter_leaves_last_admitted_alone() {
    let gate = AdmissionGate::new(RateLimitPolicy::every(INTERVAL, true));

    gate.admit(&request()).await.unwrap();
    let first = gate.last_admitted().await;

    let gave_up = tokio::time::timeout(Duration::from_secs(3), gate.admit(&request())).await;
    assert!(gave_up.is_err());
    assert_eq!(gate.last_admitted().await, first);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_approval_denies_but_records_admission() {
    let decision = FixedDecision::new(ApprovalOutcome::Rejected);
    let gate = AdmissionGate::new(RateLimitPolicy::unlimited())
        .with_approval(decision.clone(), Duration::from_secs(300));

    let err = gate.admit(&request()).await.unwrap_err();

    assert_eq!(err, GateError::RequestDenied);
    assert_eq!(decision.asked.load(Ordering::SeqCst), 1);
    assert!(gate.last_admitted().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_approved_request_is_admitted() {
    let decision = FixedDecision::new(ApprovalOutcome::Approved);
    let gate = AdmissionGate::new(RateLimitPolicy::every(INTERVAL, false))
        .with_approval(decision.clone(), Duration::from_secs(300));

    gate.admit(&request()).await.unwrap();
    assert_eq!(decision.asked.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_throttled_request_never_reaches_the_operator() {
    let decision = FixedDecision::new(ApprovalOutcome::Approved);
    let gate = AdmissionGate::new(RateLimitPolicy::every(INTERVAL, false))
        .with_approval(decision.clone(), Duration::from_secs(300));

    gate.admit(&request()).await.unwrap();
    assert!(matches!(
        gate.admit(&request()).await,
        Err(GateError::RateLimitExceeded { .. })
    ));
    assert_eq!(decision.asked.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_approval_times_out() {
    let (channel, mut rx) = QueuedApprovals::channel(8);
    let timeout = Duration::from_secs(300);
    let gate = AdmissionGate::new(RateLimitPolicy::unlimited())
        .with_approval(Arc::new(channel), timeout);

    let start = Instant::now();
    let err = gate.admit(&request()).await.unwrap_err();

    assert_eq!(err, GateError::ApprovalTimedOut { timeout });
    assert!(start.elapsed() >= timeout);

    let stale = rx.recv().await.unwrap();
    assert!(stale.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_approval_wait_does_not_block_other_requests() {
    let (channel, mut rx) = QueuedApprovals::channel(8);
    let gate = Arc::new(
        AdmissionGate::new(RateLimitPolicy::unlimited())
            .with_approval(Arc::new(channel), Duration::from_secs(300)),
    );

    let first = tokio::spawn({
        let gate = gate.clone();
        async move { gate.admit(&request()).await }
    });
    let second = tokio::spawn({
        let gate = gate.clone();
        async move { gate.admit(&request()).await }
    });

    let a = rx.recv().await.unwrap();
    let b = rx.recv().await.unwrap();
    b.approve();
    a.reject();

    let results = [first.await.unwrap(), second.await.unwrap()];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.contains(&Err(GateError::RequestDenied)));
}
