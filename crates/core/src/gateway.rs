//! The thin orchestration layer: question in, rows out.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use sqlgate_error::Result;
use tracing::info;

use crate::cache::{QueryCache, SqlParams};
use crate::config::AppConfig;
use crate::executor::{create_readonly_pool, Executor, ExplainReport};
use crate::row::ResultRow;
use crate::sanitize::sanitize_select;
use crate::translate::{build_generator, SqlGenerator};

/// The fully wired pipeline: one read-only pool, one process-wide cache, one
/// translator. Constructed explicitly so tests can build isolated instances.
pub struct Pipeline {
    pub executor: Arc<Executor>,
    pub gateway: Arc<Gateway>,
}

/// Wire the pipeline from configuration. The translator can be overridden by
/// embedders and tests; otherwise it follows the translator settings.
pub fn build_pipeline(
    config: &AppConfig,
    generator: Option<Arc<dyn SqlGenerator>>,
) -> Result<Pipeline> {
    let pool = create_readonly_pool(config.readonly_url()?)?;
    let cache = Arc::new(QueryCache::new(config.cache));
    let executor = Arc::new(Executor::new(pool, cache, config));
    let generator = generator.unwrap_or_else(|| build_generator(&config.translator));
    let gateway = Arc::new(Gateway::new(
        generator,
        Arc::clone(&executor),
        config.query.default_row_limit,
    ));
    Ok(Pipeline { executor, gateway })
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub question: String,
    pub sql: String,
    pub rows: Vec<ResultRow>,
    pub row_count: usize,
    pub execution_time_ms: f64,
}

pub struct Gateway {
    generator: Arc<dyn SqlGenerator>,
    executor: Arc<Executor>,
    default_row_limit: i64,
}

impl Gateway {
    pub fn new(
        generator: Arc<dyn SqlGenerator>,
        executor: Arc<Executor>,
        default_row_limit: i64,
    ) -> Self {
        Self {
            generator,
            executor,
            default_row_limit,
        }
    }

    /// Translate a question, sanitize the result, and execute it with the
    /// requested (or default) row limit. Both sanitization and execution
    /// failures propagate to the caller untouched.
    pub async fn ask(&self, question: &str, row_limit: Option<i64>) -> Result<AskResponse> {
        let started = Instant::now();
        let limit = row_limit.unwrap_or(self.default_row_limit);

        let raw_sql = self.generator.generate(question).await?;
        let safe_sql = sanitize_select(&raw_sql, limit)?;
        let rows = self
            .executor
            .run_readonly(&safe_sql, &SqlParams::new(), Some(limit))
            .await?;

        let execution_time_ms =
            (started.elapsed().as_secs_f64() * 1000.0 * 100.0).round() / 100.0;
        info!(
            target: "gateway",
            rows = rows.len(),
            execution_time_ms,
            "Answered question"
        );

        Ok(AskResponse {
            question: question.to_string(),
            sql: safe_sql,
            row_count: rows.len(),
            rows,
            execution_time_ms,
        })
    }

    /// Plan inspection for a caller-supplied statement.
    pub async fn explain(&self, sql: &str, row_limit: Option<i64>) -> Result<ExplainReport> {
        self.executor.explain(sql, row_limit).await
    }
}
