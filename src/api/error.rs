use crate::auth::header::AuthenticationError;
use crate::content::encoding::EncodingError;
use crate::content::key::CacheKeyError;
use crate::content::link::LinkError;
use crate::content::object::ObjectCacheError;
use crate::error::ErrorKind;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{debug, error};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub enum ApiError {
    Encoding(#[from] EncodingError),
    FailedAuthentication(#[from] AuthenticationError),
    InvalidCacheKey(#[from] CacheKeyError),
    InvalidFileId(#[from] LinkError),
    InvalidHeader(#[from] axum::http::header::InvalidHeaderValue),
    /// The upstream answered with a body that doesn't have the shape its route promises.
    /// The parse error is logged but never sent to the client.
    #[error("Invalid response format")]
    InvalidResponseFormat(serde_json::Error),
    #[error("Invalid signature")]
    InvalidSignature,
    JsonSerialization(#[from] serde_json::Error),
    #[error("Missing signature")]
    MissingSignature,
    ObjectCache(#[from] ObjectCacheError),
    PathRejection(#[from] axum::extract::rejection::PathRejection),
    QueryRejection(#[from] axum::extract::rejection::QueryRejection),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Failed to read request body: {0}")]
    RequestBody(axum::Error),
    #[error("Failed to reach upstream: {0}")]
    Upstream(reqwest::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::PathRejection(err) => err.status(),
            Self::QueryRejection(err) => err.status(),
            Self::InvalidCacheKey(_)
            | Self::InvalidFileId(_)
            | Self::InvalidHeader(_)
            | Self::InvalidResponseFormat(_)
            | Self::InvalidSignature
            | Self::MissingSignature
            | Self::RequestBody(_) => StatusCode::BAD_REQUEST,
            Self::FailedAuthentication(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Encoding(_) | Self::JsonSerialization(_) | Self::ObjectCache(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn category(&self) -> &'static str {
        match self {
            Self::Encoding(_) => "Encoding Error",
            Self::FailedAuthentication(_) => "Failed Authentication",
            Self::InvalidCacheKey(_) => "Invalid Cache Key",
            Self::InvalidFileId(_) => "Invalid File ID",
            Self::InvalidHeader(_) => "Invalid Header",
            Self::InvalidResponseFormat(_) => "Invalid Response Format",
            Self::InvalidSignature => "Invalid Signature",
            Self::JsonSerialization(_) => "JSON Serialization Error",
            Self::MissingSignature => "Missing Signature",
            Self::ObjectCache(_) => "Object Cache Error",
            Self::PathRejection(_) => "Path Rejection",
            Self::QueryRejection(_) => "Query Rejection",
            Self::RateLimited => "Rate Limited",
            Self::RequestBody(_) => "Request Body Error",
            Self::Upstream(_) => "Upstream Error",
        }
    }

    fn response(&self) -> ErrorResponse {
        ErrorResponse {
            name: self.kind(),
            title: self.category(),
            description: self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::InvalidResponseFormat(err) => debug!("Upstream body did not parse: {err}"),
            _ if status.is_server_error() => error!("{}: {self}", self.kind()),
            _ => debug!("{}: {self}", self.kind()),
        }
        (status, Json(self.response())).into_response()
    }
}

/// Represents a response if an error occured.
#[derive(Serialize)]
struct ErrorResponse {
    title: &'static str,
    name: &'static str,
    description: String,
}
