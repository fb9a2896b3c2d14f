//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use intake_core::ErrorKind;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Intake(#[from] intake_core::Error),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let ApiError::Intake(err) = self;
    let kind = err.kind();
    let status = match kind {
      ErrorKind::Validation => StatusCode::BAD_REQUEST,
      ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
      ErrorKind::Auth => StatusCode::UNAUTHORIZED,
      ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
      ErrorKind::Delivery => StatusCode::BAD_GATEWAY,
    };

    let mut res =
      (status, Json(json!({ "error": err.to_string(), "kind": kind }))).into_response();
    if let intake_core::Error::Cooldown { remaining_secs } = err {
      res.headers_mut().insert(
        header::RETRY_AFTER,
        HeaderValue::from(remaining_secs),
      );
    }
    res
  }
}
