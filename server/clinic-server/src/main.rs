use clap::Parser;
use colored::Colorize;
use std::net::SocketAddr;
use tracing::info;

use clinic_server::{create_app, ClinicConfig, ClinicServer};
use error_common::{log_error, ClinicError, Result};
use logger_redacted::{init_tracing, LogFormat};

const DEFAULT_LOG_DIRECTIVES: &str = "clinic_server=info,ipd_service=info,khata_service=info,\
appointment_service=info,lab_service=info,tower_http=info,sqlx=warn";

/// Sewa clinic engine HTTP server
#[derive(Parser, Debug)]
#[command(name = "clinic-server")]
#[command(about = "Clinic operations API: wards and beds, khata, appointments, lab lookup")]
struct Args {
    /// Server bind address, overrides `server.host`
    #[arg(long, env = "CLINIC_HOST")]
    host: Option<String>,

    /// Server port, overrides `server.port`
    #[arg(short, long, env = "CLINIC_PORT")]
    port: Option<u16>,

    /// Configuration file path
    #[arg(short, long, default_value = "clinic-server.yaml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = ClinicConfig::load(&args.config)?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let directives = if args.verbose {
        DEFAULT_LOG_DIRECTIVES.replace("=info", "=debug")
    } else {
        DEFAULT_LOG_DIRECTIVES.to_string()
    };
    init_tracing(&config.logging, &directives).map_err(|e| ClinicError::ConfigError(e.to_string()))?;

    if config.logging.format == LogFormat::Pretty {
        print_startup_banner();
    }

    if let Err(e) = run(config).await {
        log_error("clinic-server", &e);
        return Err(e);
    }
    Ok(())
}

async fn run(config: ClinicConfig) -> Result<()> {
    info!("🏥 {}", "Starting Sewa clinic engine".bright_cyan());
    info!("📋 Version: {}", env!("CARGO_PKG_VERSION").bright_white());

    let server = ClinicServer::from_config(&config).await?;
    let app = create_app(server);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| ClinicError::ConfigError(format!("Invalid bind address: {e}")))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ClinicError::NetworkError(format!("Failed to bind to {addr}: {e}")))?;

    info!("🚀 {}", format!("Clinic server running on http://{addr}").bright_green());
    info!("📋 {}", format!("Health check available at: http://{addr}/health").bright_blue());
    info!("📋 {}", format!("OpenAPI document at: http://{addr}/api-docs/openapi.json").bright_blue());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ClinicError::ServerError(format!("HTTP server error: {e}")))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}

#[allow(clippy::print_stdout)]
fn print_startup_banner() {
    println!("{}", "╔══════════════════════════════════════════════════════════════╗".bright_cyan());
    println!("{}", "║                     🏥 SEWA CLINIC ENGINE                    ║".bright_cyan());
    println!("{}", "║          Wards · Beds · Khata · Appointments · Lab           ║".bright_cyan());
    println!("{}", "╚══════════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}
