use clap::Parser;

use eighty::app::{server::start_server, types, utils};

#[derive(clap::Parser, Debug)]
#[command(version, about, long_about = None)]
struct ServerArgs {
    /// Path to the server configuration file
    #[arg(short, long, default_value = "config/server.toml")]
    config: String,
}

// Single threaded runtime
#[tokio::main(flavor = "current_thread")]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = ServerArgs::parse();

    let config = utils::read_config::<types::ServerConfig>(&args.config, Some("EIGHTY_SERVER"));

    let server_config = config.server.clone().unwrap_or_default();
    let server_address = format!("{}:{}", server_config.host, server_config.port);

    let tcp_listener = tokio::net::TcpListener::bind(&server_address).await?;

    start_server(config, tcp_listener).await;

    Ok(())
}
