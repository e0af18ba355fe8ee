//! Submit-and-poll loop for a single statement.
//!
//! Provides isolated statement execution that can be tested against a fake
//! warehouse independently of the tool layer.

use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, warn};

use super::{PollPolicy, SqlStatement};
use crate::error::Result;
use crate::warehouse::{
    StatementError, StatementHandle, StatementState, StatementStatus, WarehouseClient,
};

/// Drives one statement from submission to a terminal status.
pub struct StatementPoller<'a> {
    client: &'a dyn WarehouseClient,
}

/// Points in time that bound one execution.
#[derive(Debug, Clone, Copy)]
struct Deadlines {
    started: Instant,
    /// End of the polling budget.
    budget: Instant,
    /// Latest time a status request may still be answering.
    poll: Instant,
    /// Latest time the timeout response may be returned.
    response: Instant,
}

impl Deadlines {
    fn new(policy: PollPolicy) -> Self {
        let started = Instant::now();
        let budget = started + policy.max_wait;
        Self {
            started,
            budget,
            poll: budget + policy.interval / 2,
            response: budget + policy.interval,
        }
    }
}

impl<'a> StatementPoller<'a> {
    /// Creates a new poller on top of the given warehouse client.
    pub fn new(client: &'a dyn WarehouseClient) -> Self {
        Self { client }
    }

    /// Submits the statement and polls it until it reaches a terminal state
    /// or the policy's wait budget is spent.
    ///
    /// Returns `Err` only when submission itself fails. Running out of budget
    /// yields a synthesized `Failed` status of kind `Timeout`; the remote
    /// statement is then canceled on a best-effort basis and may keep running.
    /// Slow status or cancel requests are cut off, so the call always returns
    /// within `max_wait + interval` of submission.
    pub async fn execute(
        &self,
        statement: &SqlStatement,
        policy: PollPolicy,
    ) -> Result<StatementStatus> {
        let submitted = self.client.submit(statement.text()).await.map_err(|e| {
            warn!("Statement submission failed: {}", e);
            e
        })?;
        let handle = submitted.handle;

        let deadlines = Deadlines::new(policy);
        if submitted.status.is_terminal() {
            debug!(
                statement_id = %handle,
                "Statement {} at submission",
                submitted.status.state()
            );
            return Ok(submitted.status);
        }

        let mut last_state = submitted.status.state();
        debug!(
            statement_id = %handle,
            parameters = ?statement.parameters(),
            "Statement submitted, polling every {:?} for up to {:?}",
            policy.interval,
            policy.max_wait
        );

        loop {
            let remaining = deadlines.budget.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(self.timed_out(&handle, last_state, deadlines, policy).await);
            }

            sleep(policy.interval.min(remaining)).await;

            let status = match timeout_at(deadlines.poll, self.client.poll(&handle)).await {
                Ok(Ok(status)) => status,
                Ok(Err(e)) => {
                    warn!(statement_id = %handle, "Status poll failed: {}", e);
                    return Ok(StatementStatus::Failed(StatementError::remote(
                        None,
                        format!("failed to fetch status of statement {}: {}", handle, e),
                    )));
                }
                Err(_) => {
                    warn!(statement_id = %handle, "Status poll did not answer before the deadline");
                    return Ok(self.timed_out(&handle, last_state, deadlines, policy).await);
                }
            };

            let state = status.state();
            if state != last_state {
                debug!(
                    statement_id = %handle,
                    "Statement {} -> {} after {:?}",
                    last_state,
                    state,
                    deadlines.started.elapsed()
                );
            }

            if status.is_terminal() {
                return Ok(status);
            }
            last_state = state;
        }
    }

    /// Builds the timeout status and asks the warehouse to cancel the statement.
    ///
    /// The cancel request gets whatever is left until the response deadline.
    async fn timed_out(
        &self,
        handle: &StatementHandle,
        last_state: StatementState,
        deadlines: Deadlines,
        policy: PollPolicy,
    ) -> StatementStatus {
        let elapsed = deadlines.started.elapsed();
        warn!(
            statement_id = %handle,
            "Statement still {} after {:?}, giving up",
            last_state,
            elapsed
        );

        match timeout_at(deadlines.response, self.client.cancel(handle)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(statement_id = %handle, "Best-effort cancel failed: {}", e),
            Err(_) => warn!(statement_id = %handle, "Best-effort cancel abandoned"),
        }

        StatementStatus::Failed(StatementError::timeout(format!(
            "statement {} did not finish within {:.1}s (last state: {}, elapsed: {:.1}s); \
             it may still be running on the warehouse",
            handle,
            policy.max_wait.as_secs_f64(),
            last_state,
            elapsed.as_secs_f64()
        )))
    }
}
