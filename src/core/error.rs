//! 核心错误处理模块

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// 核心错误类型
#[derive(Debug, Error)]
pub enum CoreError {
    /// 输入缺失、格式错误或空更新
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// 唯一约束冲突（重复邮箱）
    #[error("conflict: {0}")]
    Conflict(String),

    /// 数据库不可达：连接池超时、I/O、TLS 或连接池已关闭
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// 错误响应结构
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
    pub timestamp: String,
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) | CoreError::Conflict(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::BackendUnavailable(_) | CoreError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_ERROR",
            CoreError::NotFound(_) => "NOT_FOUND",
            CoreError::Conflict(_) => "CONFLICT",
            CoreError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            CoreError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// 面向客户端的消息；后端错误只返回简短的通用描述
    pub fn public_message(&self) -> String {
        match self {
            CoreError::Validation(msg) | CoreError::NotFound(msg) | CoreError::Conflict(msg) => {
                msg.clone()
            }
            CoreError::BackendUnavailable(_) => "Database connection failed".to_string(),
            CoreError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        if let CoreError::BackendUnavailable(ref detail) | CoreError::Internal(ref detail) = self {
            error!("后端错误: {}", detail);
        }

        let status = self.status_code();
        let error_response = ErrorResponse {
            error: self.error_code().to_string(),
            message: self.public_message(),
            code: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                CoreError::Conflict("Email already exists".to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::WorkerCrashed => CoreError::BackendUnavailable(err.to_string()),
            _ => CoreError::Internal(err.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    error
                        .message
                        .as_ref()
                        .map(|msg| msg.to_string())
                        .unwrap_or_else(|| format!("Invalid value for {}", field))
                })
            })
            .collect();
        // field_errors 是 HashMap，排序保证消息稳定
        messages.sort();

        CoreError::Validation(messages.join(", "))
    }
}
