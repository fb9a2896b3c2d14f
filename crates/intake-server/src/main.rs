//! intake-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) overlaid with
//! `INTAKE__*` environment variables, opens the ledger directory, starts
//! the daily dispatch task, and serves the HTTP API.
//!
//! # Password hash generation
//!
//! To generate the argon2 PHC string for `auth_password_hash`:
//!
//! ```text
//! cargo run -p intake-server -- --hash-password
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use clap::Parser;
use intake_core::{Intake, clock::SystemClock};
use intake_ledger::CsvLedger;
use intake_server::{
  AppState, ServerConfig,
  auth::AuthConfig,
  expand_tilde,
  schedule,
  transport::{LogCodeSender, Transport},
};
use rand_core::OsRng;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Verified form intake server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
}

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

  if cli.hash_password {
    let password = read_password()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(password.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("INTAKE")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let schedule_at = server_cfg
    .schedule_time()
    .with_context(|| format!("invalid schedule_at {:?}, expected HH:MM", server_cfg.schedule_at))?;

  let ledger_root = expand_tilde(&server_cfg.ledger_root);
  tokio::fs::create_dir_all(&ledger_root)
    .await
    .with_context(|| format!("failed to create ledger root {ledger_root:?}"))?;

  let clock = Arc::new(SystemClock);
  let intake = Arc::new(Intake::new(
    Arc::new(CsvLedger::new(&ledger_root, clock.clone())),
    Arc::new(Transport::from_config(&server_cfg.transport)),
    Arc::new(LogCodeSender),
    clock,
    server_cfg.otp.clone(),
    server_cfg.dispatch.clone(),
  ));

  tokio::spawn(schedule::run_daily(intake.clone(), schedule_at));
  tracing::info!(%schedule_at, ledger_root = %ledger_root.display(), "daily dispatch scheduled");

  let state = AppState {
    intake,
    auth:   Arc::new(AuthConfig {
      username:      server_cfg.auth_username.clone(),
      password_hash: server_cfg.auth_password_hash.clone(),
    }),
    config: Arc::new(server_cfg.clone()),
  };

  let app = intake_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}
