use tokio_postgres::error::SqlState;

use crate::{ErrorCode, GateError};

impl From<tokio_postgres::Error> for GateError {
    fn from(err: tokio_postgres::Error) -> Self {
        if let Some(db) = err.as_db_error() {
            let state = db.code();
            let code = if state == &SqlState::QUERY_CANCELED {
                ErrorCode::StatementTimeout
            } else if state == &SqlState::INSUFFICIENT_PRIVILEGE {
                ErrorCode::PermissionDenied
            } else {
                ErrorCode::QueryFailed
            };
            let mut error = GateError::new(code, db.message());
            if code == ErrorCode::StatementTimeout {
                error = error.with_hint(
                    "The statement ran past the configured timeout; narrow the query or raise QUERY_TIMEOUT_SECONDS",
                );
            }
            if code == ErrorCode::PermissionDenied {
                error = error.with_hint(
                    "The read-only role cannot perform this operation; only SELECT statements are allowed",
                );
            }
            return error;
        }

        // No database-reported code: the connection itself failed.
        GateError::new(ErrorCode::ConnectionFailed, err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for GateError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        match err {
            deadpool_postgres::PoolError::Timeout(_) => GateError::new(
                ErrorCode::PoolExhausted,
                "Timed out waiting for a read-only connection",
            ),
            deadpool_postgres::PoolError::Backend(e) => e.into(),
            other => GateError::new(ErrorCode::ConnectionFailed, other.to_string()),
        }
    }
}

impl From<deadpool_postgres::CreatePoolError> for GateError {
    fn from(err: deadpool_postgres::CreatePoolError) -> Self {
        GateError::new(ErrorCode::InvalidConfig, err.to_string())
    }
}
