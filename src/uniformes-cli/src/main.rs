//! Uniformes CLI - operator access to the back office API.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Uniformes back office client
#[derive(Parser)]
#[command(name = "uniformes")]
#[command(about = "Command-line client for the Uniformes back office API")]
#[command(version)]
struct Args {
    /// Backend address for this invocation (overrides env and config)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log level
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and store the session
    Login(commands::LoginArgs),

    /// Drop the stored session
    Logout,

    /// Validate the stored session and show the signed-in user
    Whoami,

    /// Probe the backend health endpoint
    Status,

    /// GET an API path and print the JSON body
    Get(commands::GetArgs),

    /// Upload a file as multipart/form-data
    Upload(commands::UploadArgs),

    /// Download a binary resource to a file
    Download(commands::DownloadArgs),

    /// Watch backend reachability until interrupted
    Watch(commands::WatchArgs),

    /// Show or change client configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    setup_logging(&args.log_level, args.json_logs);

    let api_url = args.api_url.as_deref();
    let result = match args.command {
        Command::Login(login) => commands::login(api_url, login).await,
        Command::Logout => commands::logout(api_url),
        Command::Whoami => commands::whoami(api_url).await,
        Command::Status => commands::status(api_url).await,
        Command::Get(get) => commands::get(api_url, get).await,
        Command::Upload(upload) => commands::upload(api_url, upload).await,
        Command::Download(download) => commands::download(api_url, download).await,
        Command::Watch(watch) => commands::watch(api_url, watch).await,
        Command::Config(config) => commands::config(config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
