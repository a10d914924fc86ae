use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::mcp::rpc::json_rpc_error;

pub const UNAUTHORIZED_CODE: i32 = -32001;
pub const SERVER_ERROR_CODE: i32 = -32000;
pub const PARSE_ERROR_CODE: i32 = -32700;
pub const INVALID_REQUEST_CODE: i32 = -32600;
pub const METHOD_NOT_FOUND_CODE: i32 = -32601;
pub const INVALID_PARAMS_CODE: i32 = -32602;
pub const INTERNAL_ERROR_CODE: i32 = -32603;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("unauthorized: {message}")]
    Unauthorized { message: &'static str },
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("not acceptable: {message}")]
    NotAcceptable { message: &'static str },
    #[error("unsupported media type: {message}")]
    UnsupportedMediaType { message: &'static str },
    #[error("parse error")]
    Parse,
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    #[error("internal error")]
    Internal { code: &'static str, message: String },
}

impl AppError {
    pub fn unauthorized(message: &'static str) -> Self {
        Self::Unauthorized { message }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: "internal_error",
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Parse | Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            Self::Unauthorized { message } => (UNAUTHORIZED_CODE, message.to_string()),
            Self::MethodNotAllowed => (SERVER_ERROR_CODE, "Method not allowed.".to_string()),
            Self::NotAcceptable { message } | Self::UnsupportedMediaType { message } => {
                (SERVER_ERROR_CODE, message.to_string())
            }
            Self::Parse => (PARSE_ERROR_CODE, "Parse error".to_string()),
            Self::InvalidRequest { message } => (INVALID_REQUEST_CODE, message.clone()),
            Self::Internal { code, message } => {
                tracing::error!(code = *code, error = %message, "request failed with internal error");
                (INTERNAL_ERROR_CODE, "Internal server error".to_string())
            }
        };

        let mut response = (status, Json(json_rpc_error(None, code, &message))).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"mcp\""),
            );
        }
        response
    }
}
