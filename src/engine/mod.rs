//! Statement execution engine.
//!
//! Submits one SQL statement to the warehouse, polls it to a terminal state
//! under a bounded wait, and normalizes the outcome into a [`ToolResponse`].

mod normalizer;
mod policy;
mod poller;
mod response;
mod statement;

pub use normalizer::normalize;
pub use policy::{PollPolicy, DEFAULT_MAX_WAIT_SECS, DEFAULT_POLL_INTERVAL_SECS};
pub use poller::StatementPoller;
pub use response::{ErrorKind, ToolResponse};
pub use statement::SqlStatement;

use crate::warehouse::WarehouseClient;

/// Runs a statement end to end: submit, poll, normalize.
///
/// Submission failures become `SubmissionError` responses; every other
/// outcome is whatever the normalizer makes of the terminal status.
pub async fn run_statement(
    client: &dyn WarehouseClient,
    statement: &SqlStatement,
    policy: PollPolicy,
) -> ToolResponse {
    match StatementPoller::new(client).execute(statement, policy).await {
        Ok(status) => normalize(status),
        Err(e) => ToolResponse::error(ErrorKind::SubmissionError, e.to_string()),
    }
}
