//! Error type shared by the API handlers.
//!
//! Every handler returns `ApiResult<T>`. Failures render as
//! `{"error": "<message>"}` with the matching HTTP status; database errors
//! are logged and reported as a generic 500 (or 404 for `NotFound`).

use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, Responder, status};
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

/// Error response structure for API failures.
#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        ApiError::Conflict(msg.into())
    }

    pub fn status(&self) -> Status {
        match self {
            ApiError::BadRequest(_) => Status::BadRequest,
            ApiError::Unauthorized(_) => Status::Unauthorized,
            ApiError::Forbidden(_) => Status::Forbidden,
            ApiError::NotFound(_) => Status::NotFound,
            ApiError::Conflict(_) => Status::Conflict,
            ApiError::Database(diesel::result::Error::NotFound) => Status::NotFound,
            ApiError::Database(_) | ApiError::Internal(_) => Status::InternalServerError,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Database(diesel::result::Error::NotFound) => "Not found".to_string(),
            ApiError::Database(_) | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let status = self.status();
        if status == Status::InternalServerError {
            error!("{} {} failed: {}", req.method(), req.uri().path(), self);
        }
        let body = Json(ErrorResponse { error: self.public_message() });
        status::Custom(status, body).respond_to(req)
    }
}

/// Parses a `YYYY-MM-DD` query parameter.
pub fn parse_date_param(name: &str, value: &str) -> ApiResult<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("Invalid {}: expected YYYY-MM-DD", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::bad_request("x").status(), Status::BadRequest);
        assert_eq!(ApiError::conflict("x").status(), Status::Conflict);
        assert_eq!(ApiError::Database(diesel::result::Error::NotFound).status(), Status::NotFound);
        assert_eq!(
            ApiError::Database(diesel::result::Error::RollbackTransaction).status(),
            Status::InternalServerError
        );
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let err = ApiError::Internal("disk on fire".to_string());
        assert_eq!(err.public_message(), "Internal server error");
        let err = ApiError::forbidden("Only managers may do that");
        assert_eq!(err.public_message(), "Only managers may do that");
    }

    #[test]
    fn test_parse_date_param() {
        let d = parse_date_param("date", "2025-03-10").expect("valid date");
        assert_eq!(d, chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert!(parse_date_param("date", "10/03/2025").is_err());
    }
}
