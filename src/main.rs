//! omnifocus-gtd-mcp: MCP server for Getting Things Done with OmniFocus
//!
//! Speaks MCP over stdio and runs one automation script per tool call.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use omnifocus_gtd_mcp::config;
use omnifocus_gtd_mcp::mcp::server::McpServer;

/// MCP server for Getting Things Done with OmniFocus.
///
/// Exposes task capture, review and search tools to AI assistants, backed
/// by AppleScript automation of OmniFocus.
#[derive(Parser, Debug)]
#[command(name = "omnifocus-gtd-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Directory holding the automation scripts (overrides the config file)
    #[arg(long, value_name = "DIR")]
    scripts_dir: Option<PathBuf>,

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
            _ => Level::WARN,
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber. Logs go to stderr; stdout carries
/// protocol messages only.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the omnifocus-gtd-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nLoaded from: {}", default_path.display());
                    eprintln!("See config/example-config.json for the accepted fields");
                }
            }
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    let invoker = match config::script_invoker(&cfg.automation, args.scripts_dir.as_deref()) {
        Ok(invoker) => invoker,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        scripts_dir = %invoker.scripts_dir().display(),
        interpreter = %cfg.automation.interpreter,
        timeout_ms = cfg.automation.timeout_ms,
        "Starting omnifocus-gtd-mcp server"
    );

    if !invoker.scripts_dir().is_dir() {
        error!(
            scripts_dir = %invoker.scripts_dir().display(),
            "Scripts directory does not exist; tool calls will fail"
        );
    }

    let mut server = McpServer::new(invoker);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!("MCP server ready, waiting for client messages...");

    match runtime.block_on(server.run()) {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
