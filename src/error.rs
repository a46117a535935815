use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Failure taxonomy surfaced by services; the route layer maps each variant to
/// an HTTP status and a JSON `{"error": message}` body.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidToken(String),
    #[error("User with this email already exists")]
    DuplicateEmail,
    #[error("Unrecognized role: {0}")]
    InvalidRole(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::InvalidToken(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::DuplicateEmail => (
                StatusCode::BAD_REQUEST,
                "User with this email already exists".to_string(),
            ),
            ApiError::InvalidRole(role) => {
                (StatusCode::BAD_REQUEST, format!("Unrecognized role: {role}"))
            }
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Database(e) => {
                if is_unique_email_violation(&e) {
                    return ApiError::DuplicateEmail.into_response();
                }
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Internal(e) => {
                if e.chain()
                    .filter_map(|c| c.downcast_ref::<sqlx::Error>())
                    .any(is_unique_email_violation)
                {
                    return ApiError::DuplicateEmail.into_response();
                }
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Registration relies on the `users_email_key` unique index to close the
/// check-then-insert race; the violation surfaces here as `DuplicateEmail`.
fn is_unique_email_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation() && db.constraint() == Some("users_email_key"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_taxonomy() {
        let cases = [
            (
                ApiError::Unauthorized("nope".into()).into_response().status(),
                StatusCode::UNAUTHORIZED,
            ),
            (
                ApiError::Forbidden("no".into()).into_response().status(),
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::InvalidToken("bad".into()).into_response().status(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::DuplicateEmail.into_response().status(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::InvalidRole("plumber".into())
                    .into_response()
                    .status(),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::NotFound("gone".into()).into_response().status(),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::ServiceUnavailable("later".into())
                    .into_response()
                    .status(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Internal(anyhow::anyhow!("boom"))
                    .into_response()
                    .status(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (got, want) in cases {
            assert_eq!(got, want);
        }
    }

    #[test]
    fn internal_error_hides_cause() {
        // The Display impl of the response body must not leak the cause chain.
        let resp = ApiError::Internal(anyhow::anyhow!("secret connection string"))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
