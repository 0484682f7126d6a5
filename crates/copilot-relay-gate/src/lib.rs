//! Admission control for inbound relay requests.
//!
//! Every request passes an [`AdmissionGate`] before a token is fetched or
//! anything is sent upstream: first the rate-limit check (reject or wait),
//! then, when manual approval is enabled, an operator decision delivered
//! through an [`ApprovalChannel`].

mod approval;
mod error;
mod gate;

pub use approval::{
    ApprovalChannel, ApprovalOutcome, PendingApproval, QueuedApprovals, RequestDescriptor,
};
pub use error::GateError;
pub use gate::{AdmissionDecision, AdmissionGate, RateCheck};
