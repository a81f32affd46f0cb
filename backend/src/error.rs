//! HTTP boundary errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use crate::api::response::ErrorResponse;
use crate::k8s::ClusterError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),
}

impl AppError {
    pub fn bad_request(message: &str) -> Self {
        AppError::BadRequest(message.to_string())
    }

    /// Error code for programmatic handling
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Cluster(_) => "KUBERNETES_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Cluster(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let body = ErrorResponse::new(self.code(), self.to_string());
        (status, axum::Json(body)).into_response()
    }
}
