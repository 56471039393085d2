use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rating_core::RatingError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Rating service error: {0}")]
    Rating(#[from] RatingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Rating(RatingError::Serialization(_)) => StatusCode::BAD_REQUEST,
            ApiError::Rating(RatingError::Http(_)) | ApiError::Rating(RatingError::Store(_)) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Rating(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
