//! Error types and axum `IntoResponse` implementation.

use axum::{
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unauthorized")]
  Unauthorized,
  #[error(transparent)]
  Intake(#[from] intake_core::Error),
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    match self {
      Error::Unauthorized => {
        let mut res =
          (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Basic realm=\"intake\""),
        );
        res
      }
      Error::Intake(e) => intake_api::ApiError::from(e).into_response(),
    }
  }
}
