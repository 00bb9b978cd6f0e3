use clap::Parser;
use yutnori_server::{Server, ServerError};

/// Authoritative Yutnori game server.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Port to listen on.
    #[arg(long, default_value_t = 42069)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let server = Server::bind(&format!("0.0.0.0:{}", args.port)).await?;
    server.run().await
}
