use anyhow::{Context, Result};
use sqlgate_core::{sanitize_select, AppConfig, Pipeline, SqlParams};

pub fn build_pipeline(config_path: Option<&str>) -> Result<Pipeline> {
    let config = match config_path {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::from_env()?,
    };
    Ok(sqlgate_core::build_pipeline(&config, None)?)
}

pub async fn ask(pipeline: &Pipeline, question: &str, limit: Option<i64>) -> Result<()> {
    let response = pipeline.gateway.ask(question, limit).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&response).context("Failed to render response")?
    );
    Ok(())
}

pub async fn sql(pipeline: &Pipeline, query: &str, limit: Option<i64>) -> Result<()> {
    // Same contract as /ask without the translator in front: the statement is
    // sanitized and then hard-capped by the executor wrapping.
    let safe_sql = sanitize_select(query, limit.unwrap_or(1000))?;
    let rows = pipeline
        .executor
        .run_readonly(&safe_sql, &SqlParams::new(), limit)
        .await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&rows).context("Failed to render rows")?
    );
    Ok(())
}

pub async fn explain(pipeline: &Pipeline, query: &str, limit: Option<i64>) -> Result<()> {
    let report = pipeline.gateway.explain(query, limit).await?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to render plan")?
    );
    Ok(())
}
