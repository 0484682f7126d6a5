use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use uuid::Uuid;

/// What the operator is shown when asked to approve a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestDescriptor {
    pub id: Uuid,
    pub endpoint: String,
    pub model: Option<String>,
    pub message_count: usize,
}

impl RequestDescriptor {
    pub fn new(endpoint: impl Into<String>, model: Option<String>, message_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            endpoint: endpoint.into(),
            model,
            message_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved,
    Rejected,
}

/// Source of per-request operator decisions.
///
/// Implementations must not time out on their own; the gate bounds the wait.
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
    async fn request_approval(&self, descriptor: &RequestDescriptor) -> ApprovalOutcome;
}

/// A request waiting on an operator decision.
///
/// Dropping it without answering rejects the request.
#[derive(Debug)]
pub struct PendingApproval {
    pub descriptor: RequestDescriptor,
    response_tx: oneshot::Sender<ApprovalOutcome>,
}

impl PendingApproval {
    pub fn approve(self) {
        self.respond(ApprovalOutcome::Approved);
    }

    pub fn reject(self) {
        self.respond(ApprovalOutcome::Rejected);
    }

    pub fn respond(self, outcome: ApprovalOutcome) {
        if self.response_tx.send(outcome).is_err() {
            debug!(request_id = %self.descriptor.id, "approval answered after the request gave up");
        }
    }

    /// True once the waiting request has timed out or been cancelled.
    pub fn is_closed(&self) -> bool {
        self.response_tx.is_closed()
    }
}

/// [`ApprovalChannel`] that queues requests for an external consumer, such as
/// a terminal prompt reading from the paired receiver.
#[derive(Debug, Clone)]
pub struct QueuedApprovals {
    approval_tx: mpsc::Sender<PendingApproval>,
}

impl QueuedApprovals {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PendingApproval>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { approval_tx: tx }, rx)
    }
}

#[async_trait]
impl ApprovalChannel for QueuedApprovals {
    async fn request_approval(&self, descriptor: &RequestDescriptor) -> ApprovalOutcome {
        let (tx, rx) = oneshot::channel();

        let pending = PendingApproval {
            descriptor: descriptor.clone(),
            response_tx: tx,
        };

        if self.approval_tx.send(pending).await.is_err() {
            debug!(request_id = %descriptor.id, "approval queue closed");
            return ApprovalOutcome::Rejected;
        }

        rx.await.unwrap_or(ApprovalOutcome::Rejected)
    }
}
