use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use interviews::{Interviews, InterviewsConfig};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};

use interfy_server::{shutdown, web};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const INTERVIEWS_MODULE: &str = "interviews";

/// Interfy Server - interview tracker backend
#[derive(Parser)]
#[command(name = "interfy-server")]
#[command(about = "Interfy Server - interview tracker backend")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Interfy Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");
    let addr = web::bind_addr(&config.server)?;
    let interviews_cfg: InterviewsConfig = config.module_config(INTERVIEWS_MODULE)?;

    let interviews = Interviews::init(interviews_cfg);
    let app = web::build_app(interviews.router(), &config.server);

    let result = web::serve(app, addr, async {
        if let Err(e) = shutdown::wait_for_shutdown().await {
            tracing::error!("Signal handling failed: {}", e);
        }
        tracing::info!("HTTP server shutting down gracefully");
    })
    .await;

    interviews.shutdown().await;
    tracing::info!("Interfy Server stopped");
    result
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    web::bind_addr(&config.server)?;
    let _: InterviewsConfig = config.module_config(INTERVIEWS_MODULE)?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);
    Ok(())
}
