use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "sqlgate", about = "Ask questions of a relational dataset", version)]
struct Cli {
    /// YAML config file; falls back to environment variables when omitted.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Translate a natural-language question to SQL and execute it
    Ask {
        question: String,
        /// Hard row cap for the result (1-10000)
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Run a read-only SELECT directly
    Sql {
        query: String,
        /// Hard row cap for the result
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Show the execution plan for a SELECT
    Explain {
        query: String,
        /// Row cap applied before planning (default 50)
        #[arg(long)]
        limit: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let pipeline = commands::build_pipeline(cli.config.as_deref())?;

    match cli.command {
        Command::Ask { question, limit } => commands::ask(&pipeline, &question, limit).await,
        Command::Sql { query, limit } => commands::sql(&pipeline, &query, limit).await,
        Command::Explain { query, limit } => commands::explain(&pipeline, &query, limit).await,
    }
}
