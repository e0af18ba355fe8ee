//! Maps a terminal statement status to the tool response contract.
//!
//! This is a structural mapping only: cell values are passed through
//! untouched, with no type coercion or reformatting.

use tracing::error;

use super::{ErrorKind, ToolResponse};
use crate::warehouse::StatementStatus;

/// Message reported for canceled statements.
const CANCELED_MESSAGE: &str = "statement canceled";

/// Converts a terminal status into a [`ToolResponse`].
///
/// Non-terminal statuses never reach this point in a correct program and are
/// reported as `InternalError`.
pub fn normalize(status: StatementStatus) -> ToolResponse {
    match status {
        StatementStatus::Succeeded { columns, rows } => {
            if let Some((index, row)) = rows
                .iter()
                .enumerate()
                .find(|(_, row)| row.len() != columns.len())
            {
                error!(
                    "Result row {} has {} cells but {} columns were declared",
                    index,
                    row.len(),
                    columns.len()
                );
                return ToolResponse::error(
                    ErrorKind::InternalError,
                    format!(
                        "result row {} has {} cells, expected {}",
                        index,
                        row.len(),
                        columns.len()
                    ),
                );
            }
            ToolResponse::ok(columns, rows)
        }
        StatementStatus::Failed(err) => ToolResponse::error(err.kind, err.describe()),
        StatementStatus::Canceled => ToolResponse::error(ErrorKind::Canceled, CANCELED_MESSAGE),
        StatementStatus::Pending | StatementStatus::Running => {
            let state = status.state();
            error!("Non-terminal status {} reached the result normalizer", state);
            ToolResponse::error(
                ErrorKind::InternalError,
                format!("statement is still {state}; expected a terminal state"),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{ColumnInfo, StatementError};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_succeeded_keeps_shape() {
        let columns = vec![ColumnInfo::new("id", "INT"), ColumnInfo::new("name", "STRING")];
        let rows = vec![
            vec![json!("1"), json!("Alice")],
            vec![json!("2"), json!("Bob")],
            vec![json!("3"), json!(null)],
        ];

        match normalize(StatementStatus::succeeded(columns.clone(), rows.clone())) {
            ToolResponse::Ok {
                columns: out_columns,
                rows: out_rows,
            } => {
                assert_eq!(out_columns.len(), 2);
                assert_eq!(out_rows.len(), 3);
                assert!(out_rows.iter().all(|row| row.len() == 2));
                // Cells pass through untouched
                assert_eq!(out_rows, rows);
                assert_eq!(out_columns, columns);
            }
            other => panic!("Expected Ok, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_result_is_ok() {
        let response = normalize(StatementStatus::succeeded(
            vec![ColumnInfo::new("id", "INT")],
            vec![],
        ));
        assert!(response.is_ok());
        assert_eq!(
            response.to_json(),
            json!({ "status": "ok", "columns": ["id"], "rows": [] })
        );
    }

    #[test]
    fn test_ragged_rows_are_internal_error() {
        let response = normalize(StatementStatus::succeeded(
            vec![ColumnInfo::new("a", "INT"), ColumnInfo::new("b", "INT")],
            vec![vec![json!(1), json!(2)], vec![json!(3)]],
        ));
        assert_eq!(response.error_kind(), Some(ErrorKind::InternalError));
    }

    #[test]
    fn test_failed_maps_to_remote_execution_error() {
        let response = normalize(StatementStatus::Failed(StatementError::remote(
            Some("PARSE_SYNTAX_ERROR".to_string()),
            "Syntax error at or near 'SELEC'",
        )));

        assert_eq!(
            response,
            ToolResponse::error(
                ErrorKind::RemoteExecutionError,
                "[PARSE_SYNTAX_ERROR] Syntax error at or near 'SELEC'"
            )
        );
    }

    #[test]
    fn test_timeout_keeps_kind() {
        let response = normalize(StatementStatus::Failed(StatementError::timeout(
            "statement x did not finish",
        )));
        assert_eq!(response.error_kind(), Some(ErrorKind::Timeout));
    }

    #[test]
    fn test_canceled() {
        assert_eq!(
            normalize(StatementStatus::Canceled),
            ToolResponse::error(ErrorKind::Canceled, "statement canceled")
        );
    }

    #[test]
    fn test_non_terminal_is_internal_error() {
        for status in [StatementStatus::Pending, StatementStatus::Running] {
            assert_eq!(
                normalize(status).error_kind(),
                Some(ErrorKind::InternalError)
            );
        }
    }
}
