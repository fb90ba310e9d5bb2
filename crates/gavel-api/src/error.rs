use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gavel_db::StoreError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error taxonomy at the service boundary. Every failure maps to a
/// stable kind and a human-readable message; storage error text never
/// reaches the caller, only the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage unavailable")]
    Unavailable,

    #[error("internal server error")]
    Internal,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Forbidden => "forbidden",
            ApiError::NotFound => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Conflict(_) => "conflict",
            ApiError::Unavailable => "unavailable",
            ApiError::Internal => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.kind(),
            "message": self.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            // A caller outside a conversation sees the same 404 as a
            // missing one, so existence is never leaked.
            StoreError::NotFound | StoreError::NotParticipant => ApiError::NotFound,
            StoreError::PairExists => {
                ApiError::Conflict("a conversation for this pair already exists".into())
            }
            StoreError::EmptyContent => {
                ApiError::BadRequest("message content must not be empty".into())
            }
            StoreError::SelfConversation => {
                ApiError::BadRequest("cannot start a conversation with yourself".into())
            }
            StoreError::BidderNotLinked => {
                ApiError::BadRequest("bidder is not linked to this property".into())
            }
            StoreError::BidRejected(reason) => ApiError::BadRequest(reason),
            StoreError::Sqlite(e) => {
                tracing::error!(error = %e, "storage failure");
                ApiError::Unavailable
            }
            StoreError::LockPoisoned => {
                tracing::error!("database lock poisoned");
                ApiError::Internal
            }
        }
    }
}

/// Run a blocking storage closure off the async runtime and fold both
/// the join error and the store error into the API taxonomy.
pub async fn run_blocking<T, F>(f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            tracing::error!("spawn_blocking join error: {}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}
