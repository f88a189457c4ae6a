use std::time::Duration;
use thiserror::Error;

/// 推送错误类型
#[derive(Error, Debug)]
pub enum PushError {
    /// 网关凭据缺失
    #[error("Push gateway not configured: missing {0}")]
    NotConfigured(String),

    /// 签名密钥无法读取或解析
    #[error("Invalid push gateway key: {0}")]
    InvalidKey(String),

    /// 连接池已关闭
    #[error("Push gateway pool is closed")]
    Closed,

    /// 整批请求失败
    #[error("Gateway request failed: {0}")]
    Gateway(String),

    /// 网关调用超时
    #[error("Gateway call timed out after {0:?}")]
    Timeout(Duration),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// 推送结果类型
pub type Result<T> = std::result::Result<T, PushError>;

impl PushError {
    /// 是否属于配置类错误（不应重试）
    pub fn is_configuration(&self) -> bool {
        matches!(self, PushError::NotConfigured(_) | PushError::InvalidKey(_))
    }
}
