//! Mock warehouse clients for testing.
//!
//! [`MockWarehouseClient`] answers every statement immediately with canned
//! data. [`ScriptedWarehouseClient`] replays a fixed sequence of poll results
//! and records every call, for exercising the poller's state machine.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::{ColumnInfo, StatementHandle, StatementStatus, SubmittedStatement, WarehouseClient};
use crate::error::{Result, WarehouseMcpError};
use async_trait::async_trait;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A mock warehouse that returns predefined results.
#[derive(Debug, Default)]
pub struct MockWarehouseClient {
    next_id: AtomicUsize,
    statements: Mutex<HashMap<StatementHandle, String>>,
}

impl MockWarehouseClient {
    /// Creates a new mock warehouse client.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WarehouseClient for MockWarehouseClient {
    async fn submit(&self, sql: &str) -> Result<SubmittedStatement> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = StatementHandle::new(format!("mock-{id}"));
        lock(&self.statements).insert(handle.clone(), sql.to_string());
        Ok(SubmittedStatement::pending(handle))
    }

    async fn poll(&self, handle: &StatementHandle) -> Result<StatementStatus> {
        let sql = lock(&self.statements)
            .get(handle)
            .cloned()
            .ok_or_else(|| WarehouseMcpError::api(format!("unknown statement {handle}")))?;

        let sql_upper = sql.trim_start().to_uppercase();
        let returns_rows = ["SELECT", "SHOW", "DESCRIBE", "WITH"]
            .iter()
            .any(|kw| sql_upper.starts_with(kw));

        if returns_rows {
            let columns = vec![ColumnInfo::new("result", "STRING")];
            let rows = vec![vec![serde_json::Value::String(format!(
                "Mock result for: {sql}"
            ))]];
            Ok(StatementStatus::succeeded(columns, rows))
        } else {
            // DDL and DML return no result set
            Ok(StatementStatus::succeeded(vec![], vec![]))
        }
    }
}

/// A warehouse that replays a script of poll results.
///
/// Each poll consumes the next scripted status; once a single status is
/// left it is returned forever, so `vec![StatementStatus::Running]` models
/// a statement that never finishes.
#[derive(Debug)]
pub struct ScriptedWarehouseClient {
    script: Mutex<VecDeque<StatementStatus>>,
    submit_status: StatementStatus,
    submit_error: Option<String>,
    poll_error: Option<String>,
    cancel_error: Option<String>,
    poll_delay: Duration,
    cancel_delay: Duration,
    submitted: Mutex<Vec<String>>,
    polls: AtomicUsize,
    cancels: AtomicUsize,
}

impl ScriptedWarehouseClient {
    /// Creates a client that replays the given poll results.
    pub fn new(script: Vec<StatementStatus>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            submit_status: StatementStatus::Pending,
            submit_error: None,
            poll_error: None,
            cancel_error: None,
            poll_delay: Duration::ZERO,
            cancel_delay: Duration::ZERO,
            submitted: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
            cancels: AtomicUsize::new(0),
        }
    }

    /// Creates a client whose polls immediately report the given status.
    pub fn completing_with(status: StatementStatus) -> Self {
        Self::new(vec![status])
    }

    /// Reports the given status with every submission.
    pub fn with_submit_status(mut self, status: StatementStatus) -> Self {
        self.submit_status = status;
        self
    }

    /// Makes every submission fail with the given message.
    pub fn with_submit_error(mut self, message: impl Into<String>) -> Self {
        self.submit_error = Some(message.into());
        self
    }

    /// Makes every poll fail with the given message.
    pub fn with_poll_error(mut self, message: impl Into<String>) -> Self {
        self.poll_error = Some(message.into());
        self
    }

    /// Makes every cancel request fail with the given message.
    pub fn with_cancel_error(mut self, message: impl Into<String>) -> Self {
        self.cancel_error = Some(message.into());
        self
    }

    /// Makes every poll take the given time before answering.
    pub fn with_poll_delay(mut self, delay: Duration) -> Self {
        self.poll_delay = delay;
        self
    }

    /// Makes every cancel request take the given time before answering.
    pub fn with_cancel_delay(mut self, delay: Duration) -> Self {
        self.cancel_delay = delay;
        self
    }

    /// Number of submit calls seen, including failed ones.
    pub fn submit_count(&self) -> usize {
        lock(&self.submitted).len()
    }

    /// SQL text of every submit call, in order.
    pub fn submitted_sql(&self) -> Vec<String> {
        lock(&self.submitted).clone()
    }

    /// Number of poll calls seen.
    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Number of cancel calls seen.
    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WarehouseClient for ScriptedWarehouseClient {
    async fn submit(&self, sql: &str) -> Result<SubmittedStatement> {
        let count = {
            let mut submitted = lock(&self.submitted);
            submitted.push(sql.to_string());
            submitted.len()
        };

        match &self.submit_error {
            Some(message) => Err(WarehouseMcpError::connection(message.clone())),
            None => Ok(SubmittedStatement {
                handle: StatementHandle::new(format!("scripted-{count}")),
                status: self.submit_status.clone(),
            }),
        }
    }

    async fn poll(&self, _handle: &StatementHandle) -> Result<StatementStatus> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if !self.poll_delay.is_zero() {
            tokio::time::sleep(self.poll_delay).await;
        }

        if let Some(message) = &self.poll_error {
            return Err(WarehouseMcpError::api(message.clone()));
        }

        let mut script = lock(&self.script);
        match script.len() {
            0 => Err(WarehouseMcpError::internal("poll script is empty")),
            1 => Ok(script[0].clone()),
            _ => Ok(script.pop_front().unwrap_or(StatementStatus::Pending)),
        }
    }

    async fn cancel(&self, _handle: &StatementHandle) -> Result<()> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        if !self.cancel_delay.is_zero() {
            tokio::time::sleep(self.cancel_delay).await;
        }
        match &self.cancel_error {
            Some(message) => Err(WarehouseMcpError::api(message.clone())),
            None => Ok(()),
        }
    }
}
