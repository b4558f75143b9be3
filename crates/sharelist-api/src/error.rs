use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("External dependency error: {0}")]
    External(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl AppError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::External(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sharelist_core::Error> for AppError {
    fn from(error: sharelist_core::Error) -> Self {
        use sharelist_core::Error as Core;

        match error {
            Core::InvalidInput(message) => Self::BadRequest(message),
            Core::NotFound(message) => Self::NotFound(message),
            error @ (Core::Remote(_) | Core::Http(_)) => Self::External(error.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            return Incident::new(status, self.to_string()).into_response();
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// A server-side failure reported to the client only by its id.
///
/// The full message travels in the response extensions so the incident
/// middleware can log it next to the request context.
#[derive(Debug, Clone)]
pub struct Incident {
    pub id: String,
    pub status: StatusCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct IncidentBody {
    message: String,
    error_id: String,
}

impl Incident {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            status,
            message: message.into(),
        }
    }

    pub fn public_message(&self) -> String {
        format!("Something went wrong (ID: {})", self.id)
    }
}

impl IntoResponse for Incident {
    fn into_response(self) -> Response {
        let body = IncidentBody {
            message: self.public_message(),
            error_id: self.id.clone(),
        };
        let mut response = (self.status, Json(body)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_message() {
        let response = AppError::BadRequest("bad list id".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.extensions().get::<Incident>().is_none());
    }

    #[test]
    fn server_errors_become_incidents() {
        let response = AppError::External("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let incident = response.extensions().get::<Incident>().unwrap();
        assert!(Uuid::parse_str(&incident.id).is_ok());
        assert!(incident.message.contains("connection refused"));
        assert_eq!(
            incident.public_message(),
            format!("Something went wrong (ID: {})", incident.id)
        );
    }

    #[test]
    fn remote_errors_map_to_bad_gateway() {
        let error = sharelist_core::RemoteError::new(Some("42P01"), "relation missing");
        let app_error = AppError::from(sharelist_core::Error::from(error));
        assert_eq!(app_error.status(), StatusCode::BAD_GATEWAY);
    }
}
