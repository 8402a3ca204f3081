//! figma-variables-mcp: MCP server for Figma design-token management
//!
//! Exposes Figma files, projects and variables as MCP tools over stdio
//! (single session) or HTTP (multiple sessions).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use figma_variables_mcp::config;
use figma_variables_mcp::figma::FigmaClient;
use figma_variables_mcp::mcp::http;
use figma_variables_mcp::mcp::server::McpServer;
use figma_variables_mcp::mcp::session::SessionManager;
use figma_variables_mcp::mcp::tools::ToolRouter;

/// MCP server for Figma design-token management.
///
/// Exposes files, projects and variables of the Figma REST API as tools
/// that AI assistants can call.
#[derive(Parser, Debug)]
#[command(name = "figma-variables-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Serve the multi-session HTTP transport on this address instead of
    /// the single-session stdio transport
    #[arg(long, value_name = "ADDR")]
    http: Option<SocketAddr>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logs go to stderr: stdout belongs to the stdio transport.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the figma-variables-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // The credential is validated once, here; a missing token aborts startup.
    let token = match cfg.resolve_token() {
        Ok(token) => token,
        Err(e) => {
            eprintln!("Credential error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting figma-variables-mcp server"
    );

    let figma = Arc::new(FigmaClient::with_base_url(
        token,
        cfg.figma.api_base.clone(),
        cfg.cache.max_entries,
        Duration::from_secs(cfg.cache.ttl_seconds),
    ));
    let router = Arc::new(ToolRouter::new(figma));
    let manager = SessionManager::new(router);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to create Tokio runtime");

    let result = runtime.block_on(async {
        let health_publisher = manager.spawn_health_publisher();
        manager.mark_running();

        let outcome = match args.http {
            Some(bind) => {
                info!(%bind, "serving multi-session HTTP transport");
                http::serve(Arc::clone(&manager), bind).await
            }
            None => {
                info!("serving single-session stdio transport");
                let mut server = McpServer::new(Arc::clone(&manager));
                server.run().await
            }
        };

        health_publisher.abort();
        outcome
    });

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            manager.mark_error();
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn log_level_resolution() {
        assert_eq!(get_log_level(0, true, "debug"), Level::ERROR);
        assert_eq!(get_log_level(0, false, "debug"), Level::DEBUG);
        assert_eq!(get_log_level(0, false, "bogus"), Level::WARN);
        assert_eq!(get_log_level(1, false, "warn"), Level::INFO);
        assert_eq!(get_log_level(3, false, "warn"), Level::TRACE);
    }
}
