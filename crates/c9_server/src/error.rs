//! Server error types and their HTTP mapping.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use c9_repo::RepoError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a request or starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Repository error.
    #[error(transparent)]
    Repo(#[from] RepoError),

    /// The request body has a media type the resource does not accept.
    #[error("unsupported media type")]
    UnsupportedMediaType,

    /// The request body is not valid JSON for the resource.
    #[error("failed to parse JSON: {0}")]
    BadJson(String),

    /// No resource lives at the requested path.
    #[error("not found")]
    NotFound,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Maps the error to an HTTP status code.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Repo(err) => match err {
                RepoError::NotFound { .. } => StatusCode::NOT_FOUND,
                RepoError::Duplicate { .. } => StatusCode::CONFLICT,
                RepoError::PreconditionRequired { .. } => StatusCode::PRECONDITION_REQUIRED,
                RepoError::PreconditionFailed { .. } => StatusCode::PRECONDITION_FAILED,
                RepoError::Invalid(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::BadJson(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message sent to the client.
    ///
    /// Server-side failures are never described to the client.
    fn public_message(&self) -> String {
        match self {
            Self::Repo(RepoError::NotFound { .. }) | Self::NotFound => "Not Found".to_string(),
            Self::Repo(RepoError::Duplicate { entity_type, .. }) => {
                format!("There is already a {entity_type} with that name.")
            }
            Self::Repo(RepoError::PreconditionRequired { .. }) => {
                "Header 'If-Match' is required".to_string()
            }
            Self::Repo(RepoError::PreconditionFailed { .. }) => "ETag mismatch".to_string(),
            Self::Repo(RepoError::Invalid(err)) => err.to_string(),
            Self::UnsupportedMediaType => "Unsupported Media Type".to_string(),
            Self::BadJson(_) => "Failed to parse JSON".to_string(),
            _ => "Internal Server Error".to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            match &self {
                Self::Repo(err) if err.is_fatal() => {
                    tracing::error!(error = %err, "repository invariant violated");
                }
                err => tracing::error!(error = %err, "request failed"),
            }
        }

        let mut response = (status, format!("{}\n", self.public_message())).into_response();
        if let Self::Repo(err) = &self {
            if let Some(current) = err.current_fingerprint() {
                if let Ok(value) = HeaderValue::from_str(&current.to_etag()) {
                    response.headers_mut().insert(header::ETAG, value);
                }
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use c9_repo::{EntityType, Fingerprint, RecordId, ValidationError};

    #[test]
    fn status_mapping() {
        let cases = [
            (
                ServerError::from(RepoError::not_found_id(EntityType::User, RecordId::new(1))),
                StatusCode::NOT_FOUND,
            ),
            (
                ServerError::from(RepoError::Duplicate {
                    entity_type: EntityType::Group,
                    existing_id: RecordId::new(1),
                    desired_name: "ops".into(),
                }),
                StatusCode::CONFLICT,
            ),
            (
                ServerError::from(RepoError::Invalid(ValidationError::new("bad"))),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServerError::from(RepoError::corrupted("user", "short key")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ServerError::UnsupportedMediaType, StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (ServerError::BadJson("eof".into()), StatusCode::BAD_REQUEST),
        ];

        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err}");
        }
    }

    #[test]
    fn precondition_response_carries_etag() {
        let current = Fingerprint::of(b"record");
        let response = ServerError::from(RepoError::PreconditionFailed { current }).into_response();

        assert_eq!(response.status(), StatusCode::PRECONDITION_FAILED);
        let etag = response.headers().get(header::ETAG).unwrap();
        assert_eq!(etag.to_str().unwrap(), current.to_etag());
    }

    #[test]
    fn internal_details_are_hidden() {
        let err = ServerError::Internal("disk on fire".into());
        assert_eq!(err.public_message(), "Internal Server Error");
    }
}
