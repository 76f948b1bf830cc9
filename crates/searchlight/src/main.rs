//! Searchlight - MCP server for SearXNG web search and page reading
//!
//! Main entry point for the Searchlight CLI.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::{serve, stdio};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Searchlight - MCP server for SearXNG web search and page reading
#[derive(Parser)]
#[command(name = "searchlight")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve MCP over Streamable HTTP
    Serve(serve::ServeArgs),

    /// Serve a single MCP session over stdin/stdout
    Stdio(stdio::StdioArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

const CRATES: [&str; 6] = [
    "searchlight",
    "searchlight_config",
    "searchlight_cache",
    "searchlight_mcp",
    "searchlight_web",
    "searchlight_server",
];

fn crate_filter(level: &str, fallback: &str) -> String {
    let mut directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    directives.push(fallback.to_string());
    directives.join(",")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Console on stderr (stdout carries the stdio protocol) + rotating JSON file
    let filter = if cli.verbose {
        crate_filter("debug", "info")
    } else {
        crate_filter("info", "warn")
    };

    let log_dir = searchlight_config::user_config_dir()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "searchlight.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(crate_filter(
                    "trace", "info",
                ))),
        )
        .init();

    let ctx = commands::Context {
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::Stdio(args) => stdio::run(args, &ctx).await,
    }
}
