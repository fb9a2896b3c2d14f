//! Intake server: configuration, shared state, and the top-level router.
//!
//! The public OTP and submission routes come from `intake-api` and are
//! mounted under `/api`. This crate adds the health probe, the
//! Basic-auth-guarded admin triggers, the outbound transports, and the
//! daily dispatch schedule.

pub mod admin;
pub mod auth;
pub mod error;
pub mod schedule;
pub mod transport;

pub use error::Error;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use axum::{
  Router,
  routing::{get, post},
};
use chrono::NaiveTime;
use intake_core::{Intake, dispatch::DispatchConfig, otp::OtpConfig};
use intake_ledger::CsvLedger;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::AuthConfig;
use transport::{LogCodeSender, Transport, TransportConfig};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `INTAKE__*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:               String,
  #[serde(default = "default_port")]
  pub port:               u16,
  #[serde(default = "default_ledger_root")]
  pub ledger_root:        PathBuf,
  /// Local wall-clock time of the daily dispatch, `HH:MM`.
  #[serde(default = "default_schedule_at")]
  pub schedule_at:        String,
  pub auth_username:      String,
  pub auth_password_hash: String,
  #[serde(default)]
  pub otp:                OtpConfig,
  #[serde(default)]
  pub dispatch:           DispatchConfig,
  #[serde(default)]
  pub transport:          TransportConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_ledger_root() -> PathBuf { PathBuf::from("ledgers") }

fn default_schedule_at() -> String { "18:00".to_owned() }

impl ServerConfig {
  pub fn schedule_time(&self) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(&self.schedule_at, "%H:%M")
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// The concrete acceptor the binary runs.
pub type Service = Intake<CsvLedger, Transport, LogCodeSender>;

/// Shared state threaded through the admin handlers.
#[derive(Clone)]
pub struct AppState {
  pub intake: Arc<Service>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

pub fn router(state: AppState) -> Router {
  let api = intake_api::api_router(state.intake.clone());

  Router::new()
    .route("/health",         get(health))
    .route("/admin/dispatch", post(admin::dispatch))
    .route("/admin/repair",   post(admin::repair))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

async fn health() -> &'static str { "ok" }

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router tests ────────────────────────────────────────────────────────────
