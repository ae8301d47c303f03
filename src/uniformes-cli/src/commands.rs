//! Command handlers.
//!
//! Each handler wires a fresh gateway from the client config and the
//! persisted session, runs one operation and prints the outcome. Gateway
//! failures are shown through the display-message table, never raw.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Subcommand};
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use uniformes_gateway::{
    ApiEndpoint, AuthClient, ClientConfig, Gateway, GatewayError, MultipartBody, RequestOptions,
    UploadFile, display_message_for,
};
use uniformes_login::{CredentialStore, FileSessionStorage, default_data_dir, mask_token};

/// Arguments for `login`.
#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account name
    pub username: String,

    /// Read the password from stdin instead of prompting
    #[arg(long)]
    pub password_stdin: bool,
}

/// Arguments for `get`.
#[derive(Debug, Args)]
pub struct GetArgs {
    /// API path below the version prefix, e.g. /schools
    pub path: String,

    /// Query parameter as KEY=VALUE (repeatable)
    #[arg(long = "param", short = 'p', value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,
}

/// Arguments for `upload`.
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// API path below the version prefix
    pub path: String,

    /// File to send
    pub file: PathBuf,

    /// Form field carrying the file
    #[arg(long, default_value = "file")]
    pub field: String,

    /// MIME type of the file
    #[arg(long)]
    pub mime: Option<String>,

    /// Extra text field as KEY=VALUE (repeatable)
    #[arg(long = "text", value_parser = parse_key_value)]
    pub text: Vec<(String, String)>,
}

/// Arguments for `download`.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// API path below the version prefix
    pub path: String,

    /// Destination file
    #[arg(long, short = 'o')]
    pub output: PathBuf,
}

/// Arguments for `watch`.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between probes (defaults to the configured interval)
    #[arg(long)]
    pub interval: Option<u64>,
}

/// `config` subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Persist a new backend address
    SetUrl {
        /// Backend base address, e.g. http://192.168.1.20:8000
        url: String,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Gateway wired to the persisted session and configured backend.
fn connect(api_url: Option<&str>) -> Result<AuthClient> {
    let config = ClientConfig::load();
    let endpoint = match api_url {
        Some(url) => ApiEndpoint::new(url)?,
        None => ApiEndpoint::from_config(&config)?,
    };

    let data_dir = default_data_dir().context("No home directory available for session storage")?;
    let storage = FileSessionStorage::new(&data_dir, &config.storage_key);
    debug!(path = %storage.path().display(), "Using session storage");

    let gateway = Gateway::builder(endpoint)
        .credential_store(Arc::new(CredentialStore::new(Arc::new(storage))))
        .timeout(config.timeout())
        .build()?;
    Ok(AuthClient::new(gateway))
}

/// Load the persisted session without a network round trip.
fn load_session(auth: &AuthClient) {
    if let Err(e) = auth.gateway().credential_store().restore() {
        debug!(error = %e, "Ignoring unreadable session");
    }
}

fn display(err: GatewayError) -> anyhow::Error {
    anyhow!(display_message_for(&err))
}

fn read_password(from_stdin: bool) -> Result<String> {
    let stdin = std::io::stdin();
    if !from_stdin && stdin.is_terminal() {
        eprint!("Password: ");
        std::io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("Empty password");
    }
    Ok(password)
}

pub async fn login(api_url: Option<&str>, args: LoginArgs) -> Result<()> {
    let auth = connect(api_url)?;
    let password = read_password(args.password_stdin)?;

    if !auth.login(&args.username, &password).await {
        let message = auth
            .session()
            .last_error()
            .unwrap_or("Login failed")
            .to_string();
        bail!(message);
    }

    let session = auth.session();
    let name = session
        .principal()
        .map(|p| p.display_name.as_str())
        .unwrap_or(&args.username);
    println!("Signed in as {name}");
    if let Some(token) = session.token() {
        println!("Token: {}", mask_token(token));
    }
    Ok(())
}

pub fn logout(api_url: Option<&str>) -> Result<()> {
    let auth = connect(api_url)?;
    load_session(&auth);
    auth.logout();
    println!("Signed out");
    Ok(())
}

pub async fn whoami(api_url: Option<&str>) -> Result<()> {
    let auth = connect(api_url)?;
    if !auth.restore_session().await {
        let session = auth.session();
        match session.last_error() {
            Some(message) => bail!(message.to_string()),
            None => bail!("Not signed in"),
        }
    }

    let session = auth.session();
    let principal = session.principal().context("Session has no principal")?;
    println!("{}", serde_json::to_string_pretty(principal)?);
    Ok(())
}

pub async fn status(api_url: Option<&str>) -> Result<()> {
    let auth = connect(api_url)?;
    let gateway = auth.gateway();
    let online = gateway.probe().await;
    println!(
        "{} {}",
        gateway.base_url(),
        if online { "online" } else { "offline" }
    );
    if !online {
        bail!("Backend unreachable");
    }
    Ok(())
}

pub async fn get(api_url: Option<&str>, args: GetArgs) -> Result<()> {
    let auth = connect(api_url)?;
    load_session(&auth);

    let options = args
        .params
        .into_iter()
        .fold(RequestOptions::default(), |options, (key, value)| {
            options.param(key, value)
        });
    let response = auth
        .gateway()
        .get(&args.path, options)
        .await
        .map_err(display)?;
    println!("{}", serde_json::to_string_pretty(&response.data)?);
    Ok(())
}

pub async fn upload(api_url: Option<&str>, args: UploadArgs) -> Result<()> {
    let auth = connect(api_url)?;
    load_session(&auth);

    let mut file = UploadFile::from_path(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    if let Some(mime) = args.mime {
        file = file.with_mime(mime);
    }
    let body = args
        .text
        .into_iter()
        .fold(MultipartBody::new().file(args.field, file), |body, (key, value)| {
            body.text(key, value)
        });

    let response = auth
        .gateway()
        .upload_multipart(&args.path, body, RequestOptions::default())
        .await
        .map_err(display)?;
    println!("{}", serde_json::to_string_pretty(&response.data)?);
    Ok(())
}

pub async fn download(api_url: Option<&str>, args: DownloadArgs) -> Result<()> {
    let auth = connect(api_url)?;
    load_session(&auth);

    let bytes = auth
        .gateway()
        .download(&args.path, RequestOptions::default())
        .await
        .map_err(display)?;
    tokio::fs::write(&args.output, &bytes)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Saved {} bytes to {}", bytes.len(), args.output.display());
    Ok(())
}

pub async fn watch(api_url: Option<&str>, args: WatchArgs) -> Result<()> {
    let config = ClientConfig::load();
    let every = args
        .interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.health_check_interval());
    let auth = connect(api_url)?;
    let gateway = auth.gateway();

    let online = gateway.probe().await;
    println!("{} {}", gateway.base_url(), if online { "online" } else { "offline" });

    let mut changes = gateway.connectivity().subscribe();
    let _poller = gateway.spawn_health_poller(every);
    info!(interval_secs = every.as_secs(), "Watching backend reachability");

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state = *changes.borrow_and_update();
                let at = state
                    .last_checked_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default();
                println!("{at} {}", if state.is_online { "online" } else { "offline" });
            }
            _ = tokio::signal::ctrl_c() => {
                return Ok(());
            }
        }
    }
}

pub fn config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = ClientConfig::load();
            if let Some(path) = ClientConfig::default_path() {
                println!("# {}", path.display());
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("# effective api_url: {}", config.resolve_api_url());
        }
        ConfigCommand::SetUrl { url } => {
            let normalized = uniformes_gateway::config::normalize_base_url(&url)?;
            let mut config = ClientConfig::load();
            config.api_url = Some(normalized.clone());
            config.save()?;
            println!("Backend address set to {normalized}");
        }
    }
    Ok(())
}
