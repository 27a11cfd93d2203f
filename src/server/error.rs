//! Error types for the REST API server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::artifact::QueryError;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// Forecast artifact has not been written yet
    ArtifactMissing,
    /// Artifact has no rows for the requested series
    NoMatch,
    /// Invalid parameter in request
    InvalidParameter(String),
    /// Internal server error
    InternalError(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::ArtifactMissing => write!(f, "Forecast file missing"),
            ApiError::NoMatch => write!(f, "No forecast found"),
            ApiError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            ApiError::ArtifactMissing => (
                StatusCode::NOT_FOUND,
                "ArtifactMissing",
                "Forecast file missing. Run: demand-pipeline predict".to_string(),
            ),
            ApiError::NoMatch => (
                StatusCode::NOT_FOUND,
                "NoMatch",
                "No forecast found for that store_id/item_id".to_string(),
            ),
            ApiError::InvalidParameter(msg) => (
                StatusCode::BAD_REQUEST,
                "InvalidParameter",
                msg.clone(),
            ),
            ApiError::InternalError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalError",
                msg.clone(),
            ),
        };

        let body = Json(json!({
            "error": error_type,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::ArtifactMissing(_) => ApiError::ArtifactMissing,
            QueryError::NoMatch { .. } => ApiError::NoMatch,
            QueryError::InvalidLimit(_) => ApiError::InvalidParameter(err.to_string()),
            QueryError::Io(_) | QueryError::Csv(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_query_errors_map_to_status_codes() {
        let cases = [
            (QueryError::ArtifactMissing(PathBuf::from("x.csv")), StatusCode::NOT_FOUND),
            (
                QueryError::NoMatch {
                    store_id: "S".to_string(),
                    item_id: "I".to_string(),
                },
                StatusCode::NOT_FOUND,
            ),
            (QueryError::InvalidLimit(0), StatusCode::BAD_REQUEST),
            (QueryError::Csv("bad row".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
