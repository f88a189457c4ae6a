use thiserror::Error;

/// 设备目录错误类型
#[derive(Error, Debug)]
pub enum DeviceError {
    /// 注册信息无效
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// 设备目录结果类型
pub type Result<T> = std::result::Result<T, DeviceError>;

impl DeviceError {
    /// 创建验证错误
    pub fn validation(msg: impl Into<String>) -> Self {
        DeviceError::ValidationError(msg.into())
    }

    /// 创建内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        DeviceError::InternalError(msg.into())
    }
}
