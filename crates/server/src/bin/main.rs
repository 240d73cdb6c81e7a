use sqlgate_server::GatewayServer;

#[derive(clap::Parser)]
struct Args {
    /// YAML config file; falls back to environment variables when omitted.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = <Args as clap::Parser>::parse();

    let mut server = GatewayServer::new();
    if let Some(config) = &args.config {
        server = server.with_config(config);
    }
    server.run().await
}
