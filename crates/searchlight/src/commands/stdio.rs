//! Stdio command - one MCP session over newline-delimited JSON-RPC.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tokio::io::BufReader;

use super::{Context, build_components, load_config};

/// Arguments for the stdio command.
#[derive(Args, Debug)]
pub struct StdioArgs {
    /// Configuration file to load after the discovered ones
    #[arg(short, long, env = "SEARCHLIGHT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Run the stdio command until stdin closes.
pub async fn run(args: StdioArgs, ctx: &Context) -> Result<()> {
    let config = load_config(args.config.as_deref(), ctx)?;
    let components = build_components(&config)?;

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let result = searchlight_mcp::serve_stdio(components.service, stdin, stdout).await;

    components.cache.shutdown();
    result?;
    Ok(())
}
