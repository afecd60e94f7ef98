mod agent;
mod ai_sdk;
mod protocol;
mod server;
mod tools;
mod transcript;
mod ui;

use clap::Parser;

/// Browser chat UI over a search-capable model agent.
#[derive(Parser)]
#[command(name = "scout")]
struct Cli {
    /// Address to serve the chat UI on.
    #[arg(long, env = "SCOUT_LISTEN", default_value = "127.0.0.1:8742")]
    listen: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scout=info".into()),
        )
        .init();

    let cli = Cli::parse();

    server::run(server::ServerConfig { listen: cli.listen }).await
}
