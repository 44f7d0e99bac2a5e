use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

pub type Result<T> = std::result::Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidDateFormat(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("datastore unavailable")]
    DatastoreUnavailable(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<diesel::result::Error> for ServiceError {
    fn from(err: diesel::result::Error) -> Self {
        ServiceError::DatastoreUnavailable(err.to_string())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::InvalidRequest(rejection.body_text())
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidDateFormat(_) | ServiceError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::DatastoreUnavailable(_)
            | ServiceError::Config(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            ServiceError::DatastoreUnavailable(detail) => {
                error!(error = %detail, "dataset store query failed");
            }
            ServiceError::Internal(err) => error!(error = ?err, "request failed"),
            ServiceError::Config(_) => error!(error = %self, "request failed"),
            ServiceError::InvalidDateFormat(_) | ServiceError::InvalidRequest(_) => {}
        }

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_bad_request() {
        let err = ServiceError::InvalidDateFormat("bad date".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "bad date");

        let err = ServiceError::InvalidRequest("end_date is required".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_hide_details_from_clients() {
        let err = ServiceError::from(diesel::result::Error::NotFound);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "datastore unavailable");
    }
}
