//! Serve command - runs the Streamable HTTP server.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use searchlight_server::{AppState, Server, ServerConfig};

use super::{Context, build_components, load_config};

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides config and MCP_HTTP_PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind to (overrides config and MCP_HTTP_HOST)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Configuration file to load after the discovered ones
    #[arg(short, long, env = "SEARCHLIGHT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let mut config = load_config(args.config.as_deref(), ctx)?;

    // CLI overrides sit on top of every other layer
    let server = config.server.get_or_insert_with(Default::default);
    if let Some(port) = args.port {
        server.port = port;
    }
    if let Some(bind) = args.bind {
        server.bind = bind;
    }

    let server = config.server();
    let bind_address = resolve_bind_address(&server.bind, server.port)?;
    let components = build_components(&config)?;

    let server_config = ServerConfig::new()
        .with_bind_address(bind_address)
        .with_request_logging(server.request_logging);
    let state = AppState::new(components.service, server_config).with_cache(components.cache);

    println!("Searchlight MCP server starting on http://{}/mcp", bind_address);
    println!("Press Ctrl+C to stop");

    Server::from_state(state)
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
            println!();
            println!("Shutting down...");
        })
        .await?;

    println!("Server stopped");
    Ok(())
}

fn resolve_bind_address(bind: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = match bind.trim() {
        "localhost" => IpAddr::from([127, 0, 0, 1]),
        other => other
            .parse()
            .with_context(|| format!("Invalid bind address '{}'", other))?,
    };
    Ok(SocketAddr::new(ip, port))
}
