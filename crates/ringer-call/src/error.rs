use crate::CallState;
use ringer_device::DeviceError;
use ringer_push::PushError;
use thiserror::Error;

/// 通话信令错误类型
#[derive(Error, Debug)]
pub enum CallError {
    /// 请求参数无效
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 通话不存在
    #[error("Call not found: {0}")]
    NotFound(String),

    /// 状态机不允许的迁移
    #[error("Call {call_id} cannot move from {from} to {to}")]
    InvalidTransition {
        call_id: String,
        from: CallState,
        to: CallState,
    },

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// 设备目录错误
    #[error(transparent)]
    Directory(#[from] DeviceError),

    /// 推送错误（仅配置类错误会走到这里）
    #[error(transparent)]
    Push(#[from] PushError),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// 通话信令结果类型
pub type Result<T> = std::result::Result<T, CallError>;

impl CallError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CallError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CallError::InternalError(msg.into())
    }
}
