//! Boot server errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use boot_engine::{EngineError, ErrorClass};
use thiserror::Error;
use tracing::{error, warn};

/// Errors that stop the server from starting or serving
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one HTTP request
#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Request deadline exceeded")]
    Timeout(#[from] tokio::time::error::Elapsed),
}

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self {
            HttpError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            HttpError::Engine(e) => match e.class() {
                ErrorClass::NotFound => StatusCode::NOT_FOUND,
                ErrorClass::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorClass::UnknownKind
                | ErrorClass::ResolutionFailure
                | ErrorClass::TransformFailure
                | ErrorClass::TemplateFailure
                | ErrorClass::Unavailable => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        } else {
            warn!(status = status.as_u16(), error = %self, "Request rejected");
        }
        (status, format!("{self}\n")).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(
            HttpError::from(EngineError::ContentNotFound(id)).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            HttpError::from(EngineError::InvalidId(Uuid::nil())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            HttpError::from(EngineError::Transform("bad".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
