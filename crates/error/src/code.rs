use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric error codes following the SQLGATE-XXXX format.
///
/// ## Code Ranges
/// - **1000-1999**: Validation errors (statement sanitizer)
/// - **2000-2999**: Translation errors (natural language to SQL)
/// - **3000-3999**: Execution errors (database boundary)
/// - **4000-4999**: Configuration errors
///
/// Codes are stable across versions (semver contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[non_exhaustive]
pub enum ErrorCode {
    // === Validation Errors (1000-1999) ===
    /// SQLGATE-1001: Empty or whitespace-only statement
    EmptyStatement = 1001,
    /// SQLGATE-1002: More than one statement in the input
    MultipleStatements = 1002,
    /// SQLGATE-1003: Statement is not a SELECT or WITH query
    NotReadOnly = 1003,
    /// SQLGATE-1004: Statement contains a write/DDL keyword
    ForbiddenKeyword = 1004,
    /// SQLGATE-1005: Statement references a restricted system catalog
    RestrictedSchema = 1005,

    // === Translation Errors (2000-2999) ===
    /// SQLGATE-2001: The translator failed to produce SQL
    TranslationFailed = 2001,
    /// SQLGATE-2002: The translator returned empty output
    EmptyTranslation = 2002,

    // === Execution Errors (3000-3999) ===
    /// SQLGATE-3001: Could not reach the database
    ConnectionFailed = 3001,
    /// SQLGATE-3002: Read-only connection pool exhausted
    PoolExhausted = 3002,
    /// SQLGATE-3003: Statement exceeded the configured timeout
    StatementTimeout = 3003,
    /// SQLGATE-3004: Database rejected or aborted the statement
    QueryFailed = 3004,
    /// SQLGATE-3005: Read-only role denied the operation
    PermissionDenied = 3005,
    /// SQLGATE-3006: Named parameter has no bound value
    UnknownParameter = 3006,

    // === Configuration Errors (4000-4999) ===
    /// SQLGATE-4001: Required configuration value is missing
    MissingConfig = 4001,
    /// SQLGATE-4002: Configuration value could not be parsed
    InvalidConfig = 4002,
}

/// Coarse grouping of error codes, matching the code ranges above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Validation,
    Translation,
    Execution,
    Config,
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        match *self as u32 {
            1000..=1999 => ErrorCategory::Validation,
            2000..=2999 => ErrorCategory::Translation,
            3000..=3999 => ErrorCategory::Execution,
            _ => ErrorCategory::Config,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SQLGATE-{:04}", *self as u32)
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.to_string()
    }
}

impl TryFrom<String> for ErrorCode {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let digits = s
            .strip_prefix("SQLGATE-")
            .ok_or_else(|| format!("Invalid error code format: {s}"))?;
        let n: u32 = digits
            .parse()
            .map_err(|_| format!("Invalid error code number: {s}"))?;
        let code = match n {
            1001 => ErrorCode::EmptyStatement,
            1002 => ErrorCode::MultipleStatements,
            1003 => ErrorCode::NotReadOnly,
            1004 => ErrorCode::ForbiddenKeyword,
            1005 => ErrorCode::RestrictedSchema,
            2001 => ErrorCode::TranslationFailed,
            2002 => ErrorCode::EmptyTranslation,
            3001 => ErrorCode::ConnectionFailed,
            3002 => ErrorCode::PoolExhausted,
            3003 => ErrorCode::StatementTimeout,
            3004 => ErrorCode::QueryFailed,
            3005 => ErrorCode::PermissionDenied,
            3006 => ErrorCode::UnknownParameter,
            4001 => ErrorCode::MissingConfig,
            4002 => ErrorCode::InvalidConfig,
            _ => return Err(format!("Unknown error code: {s}")),
        };
        Ok(code)
    }
}
