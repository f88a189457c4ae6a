use anyhow::Result;
use clap::Parser;
use ringer_config::{ConfigLoader, DEFAULT_CONFIG_PATH};
use ringer_push::ApnsConnector;
use ringer_server::{build_services, connect_database, init_tracing, issue_token, shutdown_signal};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print a bearer token for this identity and exit
    #[arg(long, value_name = "IDENTITY")]
    issue_token: Option<String>,

    /// Display name carried by the issued token
    #[arg(long, requires = "issue_token")]
    token_name: Option<String>,

    /// Lifetime of the issued token in hours
    #[arg(long, default_value_t = 24)]
    token_ttl_hours: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ConfigLoader::new(&args.config).load()?;

    if let Some(identity) = &args.issue_token {
        let token = issue_token(&config, identity, args.token_name.as_deref(), args.token_ttl_hours)?;
        println!("{token}");
        return Ok(());
    }

    init_tracing(&config.logging)?;

    info!(config = %args.config.display(), "Starting ringer server");

    let db = connect_database(&config.database.url).await?;
    let connector = Arc::new(ApnsConnector::new(config.push.clone()));
    let services = build_services(&config, db, connector);
    let router = ringer_api::create_router(services.state.clone());

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(address = %address, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let signal = shutdown_signal().await;
            info!(signal = ?signal, "Shutting down");
        })
        .await?;

    services.pool.close().await;
    info!("Server stopped");
    Ok(())
}
