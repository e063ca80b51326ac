use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Infrastructure-level failure shared by every module.
///
/// Expected business outcomes (wrong password, already paid, out of stock)
/// are modelled as per-operation result enums in the services; this type only
/// carries the failures that cross module boundaries, and it is what the REST
/// layer translates into a status code at the outermost boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] ::sqlx::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found")]
    NotFound,

    #[error("authentication required")]
    Unauthenticated,

    #[error("permission denied")]
    Forbidden,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("upstream service failure: {0}")]
    Upstream(String),

    #[error(transparent)]
    BusinessPanic(anyhow::Error),
}

impl Error {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Database(_) | Self::BusinessPanic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Internal failure details stay in the logs, not in the response body.
        let message = match &self {
            Self::Database(e) => {
                tracing::error!("database failure: {e}");
                "internal server error".to_owned()
            }
            Self::BusinessPanic(e) => {
                tracing::error!("unexpected failure: {e:#}");
                "internal server error".to_owned()
            }
            other => other.to_string(),
        };
        let body = axum::Json(serde_json::json!({ "message": message }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_taxonomy() {
        assert_eq!(
            Error::InvalidInput("empty order items".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(Error::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            Error::Conflict("order is already paid".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::Upstream("image host unreachable".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn internal_errors_never_leak_details() {
        let err = Error::BusinessPanic(anyhow::anyhow!("pool exhausted on 10.0.0.3"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
