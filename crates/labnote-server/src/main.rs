//! Lab Note Ledger server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens an
//! in-process SQLite store — the schema migrator runs on open and a failure
//! aborts startup — repairs any dangling note pointers, and serves the JSON
//! API over HTTP. With `--sync` it instead performs one synchronizer run
//! over the configured note tree and exits.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use labnote_api::ApiContext;
use labnote_core::store::LedgerStore as _;
use labnote_store_sqlite::SqliteStore;
use labnote_sync::SyncConfig;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Lab Note Ledger server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run the filesystem synchronizer once and exit instead of serving.
  #[arg(long)]
  sync: bool,

  /// With --sync: advance pointers even over admin/API edits.
  #[arg(long, requires = "sync")]
  force: bool,
}

/// Runtime server configuration, deserialised from `config.toml` plus
/// `LABNOTE_*` environment overrides.
#[derive(Debug, Clone, Deserialize)]
struct ServerConfig {
  #[serde(default = "default_host")]
  host:           String,
  #[serde(default = "default_port")]
  port:           u16,
  store_path:     PathBuf,
  /// Directory of note files for the synchronizer; optional — without it
  /// `--sync` and `POST /sync` are unavailable.
  sync_root:      Option<PathBuf>,
  #[serde(default = "default_locale")]
  default_locale: String,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 4808 }
fn default_locale() -> String { "en".to_owned() }

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("LABNOTE"))
    .build()
    .context("failed to read config file")?;
  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let sync_config = server_cfg.sync_root.as_ref().map(|root| SyncConfig {
    root:           expand_tilde(root),
    default_locale: server_cfg.default_locale.clone(),
    force:          false,
    actor:          None,
  });

  // One-shot sync mode.
  if cli.sync {
    let mut config = sync_config
      .context("--sync requires sync_root in the configuration")?;
    config.force = cli.force;

    let report = labnote_sync::run(&store, &config)
      .await
      .context("sync run failed")?;
    tracing::info!(
      files_parsed = report.files_parsed,
      files_failed = report.files_failed,
      revisions_inserted = report.counters.revisions_inserted,
      pointers_advanced = report.counters.pointers_advanced,
      pointers_protected = report.counters.pointers_protected,
      "sync run complete"
    );
    return Ok(());
  }

  // Heal any dangling pointers before taking traffic.
  let repaired = store
    .repair_pointers()
    .await
    .context("pointer repair failed")?;
  if repaired > 0 {
    tracing::warn!(repaired, "repaired note pointers at startup");
  }

  let context = ApiContext { store: Arc::new(store), sync: sync_config };
  let app = labnote_api::api_router(context).layer(TraceLayer::new_for_http());

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  tracing::info!("listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
