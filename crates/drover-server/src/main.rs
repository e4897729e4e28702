//! Drover Server - multi-model inference over HTTP
//!
//! This binary serves `/invocations` and `/ping` in front of an LRU-bounded
//! model cache.

use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use drover_server::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    server::{run_server, DroverServer},
};

/// Command line arguments
#[derive(Parser)]
#[command(
    name = "drover-server",
    about = "Multi-model inference server with an LRU-bounded model cache",
    long_about = "Serves inference requests that name the models they need. Missing models are loaded on demand and the least recently used ones are unloaded once the configured capacity is reached."
)]
struct Args {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server bind address, overrides the configuration file
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Start,
    /// Generate a default configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "drover-server.toml")]
        output: PathBuf,
        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show server information
    Info,
}

#[tokio::main]
async fn main() -> ServerResult<()> {
    let mut args = Args::parse();

    init_logging(&args)?;

    match args.command.take() {
        Some(Commands::Config { output, force }) => generate_config(output, force),
        Some(Commands::Validate { config }) => validate_config(config),
        Some(Commands::Info) => {
            show_info();
            Ok(())
        }
        Some(Commands::Start) | None => start_server(args).await,
    }
}

/// Initialize logging based on command line arguments
fn init_logging(args: &Args) -> ServerResult<()> {
    let log_level = args
        .log_level
        .parse::<Level>()
        .map_err(|_| ServerError::Config(format!("Invalid log level: {}", args.log_level)))?;

    let mut env_filter = EnvFilter::from_default_env();
    for target in ["drover_server", "drover_core", "tower_http"] {
        let directive = format!("{}={}", target, log_level)
            .parse()
            .map_err(|e| ServerError::Config(format!("Invalid log directive: {}", e)))?;
        env_filter = env_filter.add_directive(directive);
    }

    if args.json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().pretty())
            .with(env_filter)
            .init();
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> ServerResult<ServerConfig> {
    match path {
        Some(config_path) => {
            info!("Loading configuration from: {:?}", config_path);
            ServerConfig::from_file(config_path)
                .map_err(|e| ServerError::Config(format!("Failed to load config: {}", e)))
        }
        None => {
            info!("Using default configuration");
            Ok(ServerConfig::default())
        }
    }
}

/// Start the server
async fn start_server(args: Args) -> ServerResult<()> {
    info!("Starting Drover Server v{}", drover_server::VERSION);

    let mut config = load_config(args.config.as_ref())?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }

    let server = DroverServer::new(config)?;

    info!("Server configuration:");
    info!("  Bind address: {}", server.config().bind);
    info!("  Cache capacity: {}", server.config().cache.capacity);
    info!("  Overflow policy: {:?}", server.config().cache.overflow);
    info!("  Models directory: {:?}", server.config().models.models_dir);

    run_server(server).await
}

/// Generate a default configuration file
fn generate_config(output: PathBuf, force: bool) -> ServerResult<()> {
    if output.exists() && !force {
        error!("Configuration file already exists: {:?}", output);
        error!("Use --force to overwrite");
        return Err(ServerError::Config(
            "Configuration file already exists".to_string(),
        ));
    }

    ServerConfig::default().to_file(&output)?;

    info!("Generated default configuration file: {:?}", output);
    Ok(())
}

/// Validate a configuration file
fn validate_config(config_path: PathBuf) -> ServerResult<()> {
    info!("Validating configuration file: {:?}", config_path);

    let config = ServerConfig::from_file(&config_path).map_err(|e| {
        error!("Configuration validation failed: {}", e);
        ServerError::Config(format!("Invalid configuration: {}", e))
    })?;

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }

    info!("Configuration is valid");
    info!("  Bind address: {}", config.bind);
    info!("  Cache capacity: {}", config.cache.capacity);
    info!("  Models directory: {:?}", config.models.models_dir);
    Ok(())
}

/// Show server information
fn show_info() {
    let defaults = ServerConfig::default();

    println!("Drover Server v{}", drover_server::VERSION);
    println!("Multi-model inference with an LRU-bounded model cache");
    println!();
    println!("Endpoints:");
    println!("  POST /invocations   run the models named in the body");
    println!("  GET|POST /ping      liveness probe");
    println!("  GET /health         status and cache occupancy");
    println!("  GET /models         resident models and cache counters");
    println!();
    println!("Configuration:");
    println!("  Default bind address: {}", defaults.bind);
    println!("  Default cache capacity: {}", defaults.cache.capacity);
    println!("  Default models directory: {:?}", defaults.models.models_dir);
    println!("  Environment overrides: DROVER_<SECTION>__<KEY>");
    println!();
    println!("Usage:");
    println!("  drover-server                       # Start with default config");
    println!("  drover-server -c config.toml        # Start with custom config");
    println!("  drover-server config                # Generate default config");
    println!("  drover-server validate config.toml  # Validate config file");
}
