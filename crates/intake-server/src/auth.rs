//! HTTP Basic-auth extractor guarding the admin triggers.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;

use crate::{AppState, error::Error};

/// Credentials accepted for the admin endpoints.
#[derive(Clone)]
pub struct AuthConfig {
  pub username:      String,
  /// argon2 PHC string, as printed by `intake-server --hash-password`.
  pub password_hash: String,
}

/// Present in a handler's arguments means the caller is an operator.
pub struct Authenticated;

/// `(username, password)` from an `Authorization: Basic` header.
fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
  let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
  let decoded = B64.decode(value.strip_prefix("Basic ")?).ok()?;
  let pair = String::from_utf8(decoded).ok()?;
  let (user, pass) = pair.split_once(':')?;
  Some((user.to_owned(), pass.to_owned()))
}

/// Check the request's Basic credentials against the configured operator.
pub fn verify_auth(headers: &HeaderMap, config: &AuthConfig) -> Result<(), Error> {
  let (username, password) = basic_credentials(headers).ok_or(Error::Unauthorized)?;

  let hash = PasswordHash::new(&config.password_hash).map_err(|e| {
    tracing::error!(error = %e, "auth_password_hash is not a valid PHC string");
    Error::Unauthorized
  })?;
  let password_ok = Argon2::default()
    .verify_password(password.as_bytes(), &hash)
    .is_ok();

  if username == config.username && password_ok {
    Ok(())
  } else {
    tracing::warn!(%username, "rejected admin credentials");
    Err(Error::Unauthorized)
  }
}

impl FromRequestParts<AppState> for Authenticated {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState,
  ) -> Result<Self, Self::Rejection> {
    verify_auth(&parts.headers, &state.auth).map(|()| Authenticated)
  }
}
