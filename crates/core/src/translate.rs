//! Natural-language-to-SQL translation collaborator.
//!
//! The pipeline only requires a `generate(question) -> sql` capability with no
//! guarantee of validity; everything downstream assumes the output is hostile
//! until the sanitizer says otherwise. Two implementations ship: a
//! deterministic offline pattern table for tests and air-gapped deployments,
//! and a hosted-model client that falls back to the pattern table when the
//! model is unreachable.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sqlgate_error::{ErrorCode, GateError, Result};
use tracing::{debug, warn};

use crate::config::TranslatorSettings;

/// Column summary handed to the hosted model so it stays on schema.
const SCHEMA_HINT: &str = "\
Tables:
    customers(customer_id, company_name, contact_name, contact_title, city, country)
    products(product_id, product_name, unit_price, category_id, discontinued)
    orders(order_id, customer_id, employee_id, order_date, shipped_date, shipper_id, freight)
    order_details(order_id, product_id, unit_price, quantity, discount)
    categories(category_id, category_name)
    employees(employee_id, first_name, last_name, title)
    shippers(shipper_id, company_name)
";

#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate(&self, question: &str) -> Result<String>;
}

/// Deterministic offline generator: a fixed phrase-to-statement table over the
/// demo schema. Unrecognized questions degrade to `SELECT 1`.
pub struct StubGenerator;

impl StubGenerator {
    fn lookup(question: &str) -> String {
        let q = question.to_lowercase();
        let q = q.trim();
        if q.contains("list all customer names") || q.contains("list customers by name") {
            return "SELECT customer_id, company_name FROM customers ORDER BY company_name"
                .to_string();
        }
        if q.contains("top 5 customers by the total sales amount") {
            return "SELECT o.customer_id, SUM(od.unit_price * od.quantity) AS total_sales FROM orders o JOIN order_details od ON o.order_id = od.order_id GROUP BY o.customer_id ORDER BY total_sales DESC LIMIT 5".to_string();
        }
        if q.contains("monthly sales trend") || q.contains("total sales amount for each month") {
            return "SELECT DATE_TRUNC('month', o.order_date) AS month, SUM(od.unit_price * od.quantity) AS sales FROM orders o JOIN order_details od ON o.order_id = od.order_id WHERE o.order_date >= CURRENT_DATE - INTERVAL '1 year' GROUP BY month ORDER BY month".to_string();
        }
        if q.contains("top 3 products by quantity sold") || q.contains("top products by region") {
            return "SELECT c.country AS region, p.product_name, SUM(od.quantity) AS sales FROM customers c JOIN orders o ON c.customer_id = o.customer_id JOIN order_details od ON o.order_id = od.order_id JOIN products p ON od.product_id = p.product_id GROUP BY region, p.product_name ORDER BY region, sales DESC LIMIT 3".to_string();
        }
        if q.contains("company name and the total number of orders") || q.contains("customer orders")
        {
            return "SELECT c.customer_id, c.company_name, COUNT(o.order_id) AS order_count FROM customers c LEFT JOIN orders o ON c.customer_id = o.customer_id GROUP BY c.customer_id, c.company_name".to_string();
        }
        if q.contains("total number of orders for each country") || q.contains("orders by country") {
            return "SELECT c.country, COUNT(o.order_id) AS order_count FROM customers c LEFT JOIN orders o ON c.customer_id = o.customer_id GROUP BY c.country".to_string();
        }
        if q.contains("average value of their orders") || q.contains("average order value per customer")
        {
            return "SELECT c.customer_id, c.company_name, AVG(od.unit_price * od.quantity) AS avg_order_value FROM customers c JOIN orders o ON c.customer_id = o.customer_id JOIN order_details od ON o.order_id = od.order_id GROUP BY c.customer_id, c.company_name".to_string();
        }
        if q.contains("customers") && (q.contains("list") || q.contains("show") || q.contains("name"))
        {
            return "SELECT company_name FROM customers ORDER BY company_name".to_string();
        }
        if q.contains("products") && (q.contains("list") || q.contains("show") || q.contains("name"))
        {
            return "SELECT product_name FROM products ORDER BY product_name".to_string();
        }
        if q.contains("orders") && q.contains("date") {
            return "SELECT order_date FROM orders ORDER BY order_date".to_string();
        }
        "SELECT 1".to_string()
    }
}

#[async_trait]
impl SqlGenerator for StubGenerator {
    async fn generate(&self, question: &str) -> Result<String> {
        Ok(Self::lookup(question))
    }
}

/// Hosted Gemini client. Tries the configured model plus two fallbacks and
/// degrades to the offline table when every attempt fails; the gateway never
/// loses its translator because a remote endpoint is down.
pub struct GeminiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    fn prompt(question: &str) -> String {
        format!(
            "You are a Text-to-SQL assistant for PostgreSQL.\n\n\
             RULES:\n\
             - Output ONE statement only, SELECT or WITH...SELECT (no extra text).\n\
             - Use only these tables/columns (Postgres names & syntax):\n{SCHEMA_HINT}\n\
             - Never write DDL/DML; no INSERT/UPDATE/DELETE/ALTER/TRUNCATE; no pg_catalog/information_schema.\n\
             - Prefer explicit JOINs and proper GROUP BY.\n\n\
             Q: {question}\nSQL:"
        )
    }

    async fn call_model(&self, model: &str, prompt: &str) -> Result<String> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/{model}:generateContent"
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{ "parts": [{ "text": prompt }] }]
            }))
            .send()
            .await
            .map_err(|e| GateError::new(ErrorCode::TranslationFailed, e.to_string()))?
            .error_for_status()
            .map_err(|e| GateError::new(ErrorCode::TranslationFailed, e.to_string()))?;

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| GateError::new(ErrorCode::TranslationFailed, e.to_string()))?;
        let text = body["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("")
            .trim()
            .trim_matches('`')
            .trim_start_matches("sql")
            .trim()
            .to_string();
        if text.is_empty() {
            return Err(GateError::new(
                ErrorCode::EmptyTranslation,
                format!("Model {model} returned no SQL"),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl SqlGenerator for GeminiGenerator {
    async fn generate(&self, question: &str) -> Result<String> {
        let prompt = Self::prompt(question);
        let candidates = [
            self.model.as_str(),
            "models/gemini-1.5-flash",
            "models/gemini-1.5-flash-001",
        ];
        for model in candidates {
            match self.call_model(model, &prompt).await {
                Ok(sql) => {
                    debug!(target: "translate", model, "Generated SQL from hosted model");
                    return Ok(sql);
                }
                Err(e) => {
                    warn!(target: "translate", model, error = %e, "Model attempt failed");
                }
            }
        }
        // Last resort, same as a cold start without credentials.
        Ok(StubGenerator::lookup(question))
    }
}

/// Pick a generator from the translator settings.
pub fn build_generator(settings: &TranslatorSettings) -> Arc<dyn SqlGenerator> {
    if settings.use_stub {
        return Arc::new(StubGenerator);
    }
    match &settings.api_key {
        Some(key) => Arc::new(GeminiGenerator::new(key.clone(), settings.model.clone())),
        None => {
            warn!(target: "translate", "GEMINI_API_KEY not set; using offline stub generator");
            Arc::new(StubGenerator)
        }
    }
}
