//! Gazetteer CLI
//!
//! Thin command shell over the authorized client:
//! `gazetteer [--config <path>] <command>` with commands `login`,
//! `logout`, `search <query>` and `show <id>`. Credentials live in a
//! single JSON file; seed tokens are read from env vars at login and
//! refreshed automatically on 401 from then on.

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use common::Secret;
use gazetteer_auth::{CredentialStore, FileStore, SessionEvent};
use gazetteer_client::{ApiClient, ClientOptions};

use crate::config::Config;

const SEARCH_LIMIT: u32 = 20;

#[derive(Debug, PartialEq)]
enum Command {
    Login,
    Logout,
    Search { query: String },
    Show { id: i64 },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (config_arg, command) = parse_args(&args)?;

    let config_path = Config::resolve_path(config_arg);
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    info!(
        path = %config_path.display(),
        base_url = %config.api.base_url,
        "configuration loaded"
    );

    match command {
        Command::Login => login(&config).await,
        Command::Logout => logout(&config).await,
        Command::Search { query } => search(&config, &query).await,
        Command::Show { id } => show(&config, id).await,
    }
}

/// Manual arg scan: `--config <path>` may appear anywhere, the rest is
/// the command and its arguments.
fn parse_args(args: &[String]) -> Result<(Option<&str>, Command)> {
    let mut config = None;
    let mut rest = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--config" {
            config = Some(
                args.get(i + 1)
                    .map(String::as_str)
                    .context("--config requires a path")?,
            );
            i += 2;
        } else {
            rest.push(args[i].as_str());
            i += 1;
        }
    }

    let command = match rest.as_slice() {
        ["login"] => Command::Login,
        ["logout"] => Command::Logout,
        ["search", query] => Command::Search {
            query: (*query).to_owned(),
        },
        ["show", id] => Command::Show {
            id: id
                .parse()
                .with_context(|| format!("invalid place id: {id}"))?,
        },
        _ => bail!("usage: gazetteer [--config <path>] <login|logout|search <query>|show <id>>"),
    };

    Ok((config, command))
}

async fn build_client(config: &Config) -> Result<(ApiClient, Arc<FileStore>)> {
    let store = Arc::new(FileStore::load(config.credentials.path.clone()).await?);
    let client = ApiClient::with_options(
        reqwest::Client::new(),
        config.api.base_url.clone(),
        store.clone(),
        ClientOptions {
            request_timeout: Duration::from_secs(config.api.timeout_secs),
            refresh_timeout: Duration::from_secs(config.api.refresh_timeout_secs),
        },
    );
    Ok((client, store))
}

/// Surface a pipeline-triggered logout after a call completes.
fn report_session(rx: &mut broadcast::Receiver<SessionEvent>) {
    if let Ok(SessionEvent::LoggedOut) = rx.try_recv() {
        eprintln!("Session expired. Run `gazetteer login` to sign in again.");
    }
}

async fn login(config: &Config) -> Result<()> {
    let access = Secret::from_env("GAZETTEER_ACCESS_TOKEN")
        .context("GAZETTEER_ACCESS_TOKEN is not set")?;
    let refresh = Secret::from_env("GAZETTEER_REFRESH_TOKEN")
        .context("GAZETTEER_REFRESH_TOKEN is not set")?;

    let store = FileStore::load(config.credentials.path.clone()).await?;
    store
        .save(access.expose().clone(), refresh.expose().clone())
        .await?;
    info!(path = %config.credentials.path.display(), "credentials saved");
    println!("Logged in.");
    Ok(())
}

async fn logout(config: &Config) -> Result<()> {
    let (client, store) = build_client(config).await?;
    if store.get().await.is_none() {
        println!("No active session.");
        return Ok(());
    }
    client.logout().await;
    println!("Logged out.");
    Ok(())
}

async fn search(config: &Config, query: &str) -> Result<()> {
    let (client, _store) = build_client(config).await?;
    let mut logout_rx = client.subscribe_logout();

    let result = client.search_places(query, SEARCH_LIMIT).await;
    report_session(&mut logout_rx);
    let places = result.context("search failed")?;

    if places.is_empty() {
        println!("No places matched \"{query}\".");
        return Ok(());
    }
    for place in &places {
        match &place.country {
            Some(country) => println!("{:>8}  {}  ({country})", place.id, place.name),
            None => println!("{:>8}  {}", place.id, place.name),
        }
    }
    Ok(())
}

async fn show(config: &Config, id: i64) -> Result<()> {
    let (client, _store) = build_client(config).await?;
    let mut logout_rx = client.subscribe_logout();

    let result = client.fetch_place(id).await;
    report_session(&mut logout_rx);
    let place = result.with_context(|| format!("could not fetch place {id}"))?;

    println!("{} (id {})", place.name, place.id);
    if let Some(country) = &place.country {
        println!("  country: {country}");
    }
    if let (Some(lat), Some(lon)) = (place.latitude, place.longitude) {
        println!("  coordinates: {lat}, {lon}");
    }
    Ok(())
}
