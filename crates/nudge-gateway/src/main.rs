use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

mod app;
mod http;
mod run;

#[derive(Parser, Debug)]
#[command(name = "nudge-gateway", about = "Lifecycle-notification gateway")]
struct Cli {
    /// Path to nudge.toml (default: ~/.nudge/nudge.toml).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nudge_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: explicit path > NUDGE_CONFIG env > ~/.nudge/nudge.toml
    let config_path = cli.config.or_else(|| std::env::var("NUDGE_CONFIG").ok());
    let config = nudge_core::config::NudgeConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        nudge_core::config::NudgeConfig::default()
    });

    // Reject inconsistent drip tunables before the first run, not during it.
    nudge_policy::validate(&config.drip)?;

    if config.gateway.trigger.mode != nudge_core::config::TriggerAuthMode::None
        && config.gateway.trigger.secret.is_none()
    {
        warn!("trigger auth is enabled but no secret is configured; every run will 401");
    }

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    // initialize SQLite database — single file for all subsystems
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // run all schema migrations (idempotent)
    nudge_directory::db::init_db(&db)?;
    nudge_dispatch::db::init_db(&db)?;
    info!("database migrations complete");

    // build subsystems — each gets its own connection for thread safety
    let directory = nudge_directory::DirectoryStore::new(rusqlite::Connection::open(db_path)?)?;
    let dispatch = nudge_dispatch::DispatchStore::new(rusqlite::Connection::open(db_path)?)?;

    let notifiers = build_notifiers(&config);
    if notifiers.is_empty() {
        warn!("no notifiers configured — drip runs will reserve slots but deliver nothing");
    }

    let templates = nudge_notify::TemplateEngine::with_defaults()?;

    let state = Arc::new(app::AppState::new(
        config, directory, dispatch, notifiers, templates,
    ));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!(%addr, "nudge gateway listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Construct every notifier the config enables.
fn build_notifiers(config: &nudge_core::config::NudgeConfig) -> nudge_notify::NotifierRegistry {
    let mut registry = nudge_notify::NotifierRegistry::new();

    if let Some(ref email_cfg) = config.notifiers.email {
        match nudge_notify::SmtpNotifier::from_config(email_cfg) {
            Ok(n) => registry.register(Box::new(n)),
            Err(e) => warn!(error = %e, "email notifier disabled: bad config"),
        }
    }
    if let Some(ref slack_cfg) = config.notifiers.slack {
        match nudge_notify::SlackNotifier::from_config(slack_cfg) {
            Ok(n) => registry.register(Box::new(n)),
            Err(e) => warn!(error = %e, "slack notifier disabled: bad config"),
        }
    }

    registry
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }
}
