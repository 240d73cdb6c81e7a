//! Statement sanitizer.
//!
//! Validates a candidate SQL string into a single read-only statement with an
//! enforced row cap. This is the textual half of the read-only contract; the
//! database role on the executor's connection is the second layer, and the two
//! are deliberately redundant.

use once_cell::sync::Lazy;
use regex::Regex;
use sqlgate_error::{ErrorCode, GateError, Result};

static BLOCKED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(INSERT|UPDATE|DELETE|DROP|ALTER|TRUNCATE|CREATE|GRANT|REVOKE|VACUUM|ANALYZE)\b",
    )
    .expect("blocked keyword pattern")
});

static RESTRICTED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(pg_catalog|information_schema)\b").expect("restricted schema pattern")
});

static TERMINAL_LIMIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\blimit\b\s+\d+\s*$").expect("terminal limit pattern"));

static FETCH_FIRST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bfetch\s+first\b").expect("fetch first pattern"));

/// True when the statement already carries a row cap: a `LIMIT <n>` at the
/// very end, or a `FETCH FIRST` clause anywhere.
pub(crate) fn has_row_cap(sql: &str) -> bool {
    TERMINAL_LIMIT.is_match(sql) || FETCH_FIRST.is_match(sql)
}

/// Validate and normalize `sql` into a safe, single, read-only statement.
///
/// Rejections (all [`ErrorCode`] 1xxx, surfaced verbatim to the caller):
/// empty input, multiple statements, anything not starting with SELECT/WITH,
/// whole-word write/DDL keywords, references to `pg_catalog` or
/// `information_schema`.
///
/// When no row cap is present, appends `LIMIT row_limit`. An existing cap is
/// left untouched: the sanitizer guarantees *some* cap exists, not that it
/// matches `row_limit`. Callers that need a hard override use the executor's
/// subquery wrapping instead. Idempotent, no I/O.
pub fn sanitize_select(sql: &str, row_limit: i64) -> Result<String> {
    let s = sql.trim();
    if s.is_empty() {
        return Err(GateError::new(ErrorCode::EmptyStatement, "Empty SQL"));
    }

    // A single optional trailing terminator is tolerated (and dropped so the
    // appended LIMIT stays part of the statement).
    let s = s.trim_end_matches(';').trim_end();
    if s.contains(';') {
        return Err(GateError::new(
            ErrorCode::MultipleStatements,
            "Multiple statements not allowed",
        ));
    }

    let upper = s.trim_start().to_ascii_uppercase();
    if !(upper.starts_with("SELECT") || upper.starts_with("WITH")) {
        return Err(GateError::new(
            ErrorCode::NotReadOnly,
            "Only SELECT/CTE statements allowed",
        )
        .with_hint("Statements must begin with SELECT or WITH"));
    }

    if let Some(m) = BLOCKED.find(s) {
        return Err(GateError::new(
            ErrorCode::ForbiddenKeyword,
            format!("Forbidden keyword in statement: {}", m.as_str().to_ascii_uppercase()),
        ));
    }

    if let Some(m) = RESTRICTED.find(s) {
        return Err(GateError::new(
            ErrorCode::RestrictedSchema,
            format!("Restricted system schema referenced: {}", m.as_str()),
        )
        .with_hint("Query application tables instead of system catalogs"));
    }

    if has_row_cap(s) {
        Ok(s.to_string())
    } else {
        Ok(format!("{s}\nLIMIT {row_limit}"))
    }
}
