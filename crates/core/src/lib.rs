//! # sqlgate-core
//!
//! The query safety and execution pipeline behind the sqlgate gateway:
//! statement sanitization, a time-bounded result cache, bounded read-only
//! execution, and plan inspection.
//!
//! Control flow: question → translator → raw SQL → [`sanitize::sanitize_select`]
//! → safe SQL → [`cache::QueryCache`] lookup → (miss) [`executor::Executor`]
//! → rows → cache store → [`gateway::AskResponse`].

pub mod cache;
pub mod config;
pub mod executor;
pub mod gateway;
pub mod row;
pub mod sanitize;
pub mod translate;

pub use cache::{CacheConfig, CacheKey, QueryCache, SqlParams};
pub use config::AppConfig;
pub use executor::{create_readonly_pool, Executor, ExplainReport};
pub use gateway::{build_pipeline, AskResponse, Gateway, Pipeline};
pub use row::ResultRow;
pub use sanitize::sanitize_select;
pub use translate::{build_generator, GeminiGenerator, SqlGenerator, StubGenerator};
