//! Read-only statement execution.
//!
//! Every statement runs on a pooled connection whose database role holds no
//! write privileges; the sanitizer's textual checks can in principle be talked
//! around, the role cannot. A server-side `statement_timeout` is applied per
//! checkout so no statement runs unbounded, and results flow through the
//! process-wide [`QueryCache`].

use std::sync::Arc;

use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use sqlgate_error::{ErrorCode, GateError, Result};
use tokio_postgres::types::ToSql;
use tokio_postgres::NoTls;
use tracing::debug;

use crate::cache::{CacheKey, QueryCache, SqlParams};
use crate::config::AppConfig;
use crate::row::ResultRow;
use crate::sanitize::{has_row_cap, sanitize_select};

/// Execution plan as reported by `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)`.
/// The plan tree is passed through verbatim, never reinterpreted.
#[derive(Debug, Clone, Serialize)]
pub struct ExplainReport {
    pub sql: String,
    pub plan: Value,
    pub planning_time_ms: Option<f64>,
    pub execution_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jit: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Value>,
}

/// Build the read-only connection pool the executor runs on.
pub fn create_readonly_pool(url: &str) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(url.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    Ok(cfg.create_pool(Some(Runtime::Tokio1), NoTls)?)
}

pub struct Executor {
    pool: Pool,
    cache: Arc<QueryCache>,
    timeout_ms: u64,
    default_row_limit: i64,
}

impl Executor {
    pub fn new(pool: Pool, cache: Arc<QueryCache>, config: &AppConfig) -> Self {
        Self {
            pool,
            cache,
            timeout_ms: config.timeout_ms(),
            default_row_limit: config.query.default_row_limit,
        }
    }

    /// Execute a read-only statement and materialize its rows.
    ///
    /// Row-limit policy: an explicit `row_limit` wraps the whole input as
    /// `SELECT * FROM (<input>) AS _t LIMIT <n>`, overriding any embedded cap
    /// so the caller's bound always wins. Without an explicit limit the
    /// default cap is appended only when none is present — the sanitizer's
    /// append-only rule.
    ///
    /// Identical (statement, params, limit) triples are served from the cache
    /// without touching the database.
    pub async fn run_readonly(
        &self,
        sql: &str,
        params: &SqlParams,
        row_limit: Option<i64>,
    ) -> Result<Vec<ResultRow>> {
        let limit = row_limit.unwrap_or(self.default_row_limit);
        let s = sql.trim();
        let final_sql = match row_limit {
            Some(n) => format!("SELECT * FROM ({s}) AS _t LIMIT {n}"),
            None if !has_row_cap(s) => format!("{s}\nLIMIT {limit}"),
            None => s.to_string(),
        };

        let key = CacheKey::new(&final_sql, params, limit);
        if let Some(rows) = self.cache.get(&key) {
            return Ok(rows.as_ref().clone());
        }

        let client = self.pool.get().await?;
        client
            .batch_execute(&format!("SET statement_timeout = {}", self.timeout_ms))
            .await?;

        let (bound_sql, values) = bind_named(&final_sql, params)?;
        let param_refs: Vec<&(dyn ToSql + Sync)> = values
            .iter()
            .map(|v| {
                let r: &(dyn ToSql + Sync) = v.as_ref();
                r
            })
            .collect();
        let pg_rows = client.query(&bound_sql, &param_refs).await?;

        let rows = pg_rows
            .iter()
            .map(ResultRow::from_pg_row)
            .collect::<Result<Vec<_>>>()?;
        debug!(
            target: "executor",
            key = %key.fingerprint(),
            rows = rows.len(),
            "Executed read-only statement"
        );

        self.cache.put(key, rows.clone());
        Ok(rows)
    }

    /// Run `EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON)` on a sanitized SELECT.
    ///
    /// Routes through the sanitizer (append-only cap policy), so the analyzed
    /// statement is the same capped statement normal execution would see. The
    /// query executes for real; the read-only role and statement timeout
    /// contain it.
    pub async fn explain(&self, sql: &str, row_limit: Option<i64>) -> Result<ExplainReport> {
        let limit = row_limit.unwrap_or(50);
        let safe_sql = sanitize_select(sql, limit)?;

        let client = self.pool.get().await?;
        client
            .batch_execute(&format!("SET statement_timeout = {}", self.timeout_ms))
            .await?;

        let row = client
            .query_one(
                &format!("EXPLAIN (ANALYZE, BUFFERS, FORMAT JSON) {safe_sql}"),
                &[],
            )
            .await?;
        let doc: Value = match row.try_get::<_, Value>(0) {
            Ok(v) => v,
            // Some server versions hand the plan back as text.
            Err(_) => {
                let raw: String = row.try_get(0).map_err(GateError::from)?;
                serde_json::from_str(&raw)
                    .map_err(|e| GateError::new(ErrorCode::QueryFailed, e.to_string()))?
            }
        };

        // The document is a single-element array: [{"Plan": {...}, ...}]
        let top = doc.get(0).cloned().unwrap_or_else(|| json!({}));
        Ok(ExplainReport {
            sql: safe_sql,
            plan: top.get("Plan").cloned().unwrap_or_else(|| json!({})),
            planning_time_ms: top.get("Planning Time").and_then(Value::as_f64),
            execution_time_ms: top.get("Execution Time").and_then(Value::as_f64),
            jit: top.get("JIT").cloned(),
            triggers: top.get("Triggers").cloned(),
        })
    }
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"::?[A-Za-z_][A-Za-z0-9_]*").expect("placeholder pattern"));

/// Rewrite `:name` placeholders into `$n` positions and collect the bound
/// values. Positions are assigned over the referenced names in sorted order,
/// so the rewrite is deterministic for a given statement. `::type` casts pass
/// through untouched.
///
/// The scan is textual and does not parse string literals: when any
/// parameters are bound, a literal containing `:name` (`WHERE a = 'x:y'`) is
/// taken for a placeholder and fails with [`ErrorCode::UnknownParameter`].
/// Bind such values as parameters instead of inlining them.
fn bind_named(
    sql: &str,
    params: &SqlParams,
) -> Result<(String, Vec<Box<dyn ToSql + Send + Sync>>)> {
    if params.is_empty() {
        return Ok((sql.to_string(), Vec::new()));
    }

    let mut referenced: Vec<&str> = Vec::new();
    for m in PLACEHOLDER.find_iter(sql) {
        let text = m.as_str();
        if text.starts_with("::") {
            continue;
        }
        let name = &text[1..];
        if !params.contains_key(name) {
            return Err(GateError::new(
                ErrorCode::UnknownParameter,
                format!("No value bound for parameter :{name}"),
            ));
        }
        if !referenced.contains(&name) {
            referenced.push(name);
        }
    }
    referenced.sort_unstable();

    let rewritten = PLACEHOLDER.replace_all(sql, |caps: &regex::Captures<'_>| {
        let text = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
        if text.starts_with("::") {
            return text.to_string();
        }
        let name = &text[1..];
        let position = referenced
            .iter()
            .position(|r| *r == name)
            .expect("referenced names collected above");
        format!("${}", position + 1)
    });

    let values = referenced
        .iter()
        .map(|name| json_to_sql(&params[*name]))
        .collect();
    Ok((rewritten.into_owned(), values))
}

fn json_to_sql(value: &Value) -> Box<dyn ToSql + Send + Sync> {
    match value {
        Value::Null => Box::new(Option::<String>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Box::new(i)
            } else if let Some(f) = n.as_f64() {
                Box::new(f)
            } else {
                Box::new(n.to_string())
            }
        }
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(other.to_string()),
    }
}
