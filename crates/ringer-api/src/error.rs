use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ringer_call::CallError;
use ringer_device::DeviceError;
use ringer_push::PushError;
use serde_json::json;
use std::fmt;
use tracing::error;

/// API 错误类型
#[derive(Debug)]
pub enum ApiError {
    /// 验证错误
    ValidationError(String),
    /// 未认证
    Unauthorized(String),
    /// 资源未找到
    NotFound(String),
    /// 状态冲突
    Conflict(String),
    /// 依赖服务不可用（推送网关未配置或已关闭）
    ServiceUnavailable(String),
    /// 内部错误
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::ValidationError(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            ApiError::ValidationError(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::ServiceUnavailable(msg)
            | ApiError::InternalError(msg) => msg,
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %error_message, "Request failed");
        }

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

// 从 ringer_device::DeviceError 转换
impl From<DeviceError> for ApiError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::ValidationError(msg) => ApiError::ValidationError(msg),
            DeviceError::DatabaseError(err) => ApiError::InternalError(err.to_string()),
            DeviceError::InternalError(msg) => ApiError::InternalError(msg),
        }
    }
}

// 从 ringer_push::PushError 转换
impl From<PushError> for ApiError {
    fn from(err: PushError) -> Self {
        if err.is_configuration() || matches!(err, PushError::Closed) {
            ApiError::ServiceUnavailable(err.to_string())
        } else {
            ApiError::InternalError(err.to_string())
        }
    }
}

// 从 ringer_call::CallError 转换
impl From<CallError> for ApiError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::ValidationError(msg) => ApiError::ValidationError(msg),
            CallError::NotFound(id) => ApiError::NotFound(format!("call {}", id)),
            err @ CallError::InvalidTransition { .. } => ApiError::Conflict(err.to_string()),
            CallError::DatabaseError(err) => ApiError::InternalError(err.to_string()),
            CallError::Directory(err) => err.into(),
            CallError::Push(err) => err.into(),
            CallError::InternalError(msg) => ApiError::InternalError(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
