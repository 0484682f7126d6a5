//! Terminal consumer for manual approvals.

use colored::Colorize;
use copilot_relay_gate::{ApprovalOutcome, PendingApproval};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Answer queued approvals one at a time from `input`.
///
/// Requests that gave up while queued are skipped. Once input is exhausted
/// every remaining request is rejected.
pub async fn run_approval_prompt<R, W>(
    mut rx: mpsc::Receiver<PendingApproval>,
    input: R,
    mut output: W,
) where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    while let Some(pending) = rx.recv().await {
        if pending.is_closed() {
            debug!(request_id = %pending.descriptor.id, "skipping expired approval");
            continue;
        }

        let question = describe(&pending);
        if output.write_all(question.as_bytes()).await.is_err() || output.flush().await.is_err() {
            warn!("approval prompt output closed");
        }

        let outcome = match lines.next_line().await {
            Ok(Some(answer)) => parse_answer(&answer),
            Ok(None) => ApprovalOutcome::Rejected,
            Err(e) => {
                warn!(error = %e, "failed to read approval answer");
                ApprovalOutcome::Rejected
            }
        };
        pending.respond(outcome);
    }
}

fn describe(pending: &PendingApproval) -> String {
    let d = &pending.descriptor;
    format!(
        "{} {} {} ({} messages) {} ",
        "Approve request?".yellow().bold(),
        d.endpoint.cyan(),
        d.model.as_deref().unwrap_or("-").bold(),
        d.message_count,
        "[y/N]".dimmed()
    )
}

fn parse_answer(answer: &str) -> ApprovalOutcome {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => ApprovalOutcome::Approved,
        _ => ApprovalOutcome::Rejected,
    }
}
