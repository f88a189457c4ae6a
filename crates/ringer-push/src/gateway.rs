use crate::envelope::Envelope;
use crate::Result;
use async_trait::async_trait;
use ringer_device::PushEnvironment;
use std::fmt;
use std::sync::Arc;

/// 网关返回的失败原因
///
/// 未识别的原因按瞬时失败处理，不会导致令牌被清除。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    BadDeviceToken,
    Unregistered,
    DeviceTokenNotForTopic,
    PayloadTooLarge,
    TooManyRequests,
    ExpiredProviderToken,
    InternalServerError,
    ServiceUnavailable,
    /// 请求没有得到网关响应
    Transport(String),
    Unknown(String),
}

impl FailureReason {
    pub fn from_reason(reason: &str) -> Self {
        match reason {
            "BadDeviceToken" => FailureReason::BadDeviceToken,
            "Unregistered" => FailureReason::Unregistered,
            "DeviceTokenNotForTopic" => FailureReason::DeviceTokenNotForTopic,
            "PayloadTooLarge" => FailureReason::PayloadTooLarge,
            "TooManyRequests" => FailureReason::TooManyRequests,
            "ExpiredProviderToken" => FailureReason::ExpiredProviderToken,
            "InternalServerError" => FailureReason::InternalServerError,
            "ServiceUnavailable" => FailureReason::ServiceUnavailable,
            other => FailureReason::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FailureReason::BadDeviceToken => "BadDeviceToken",
            FailureReason::Unregistered => "Unregistered",
            FailureReason::DeviceTokenNotForTopic => "DeviceTokenNotForTopic",
            FailureReason::PayloadTooLarge => "PayloadTooLarge",
            FailureReason::TooManyRequests => "TooManyRequests",
            FailureReason::ExpiredProviderToken => "ExpiredProviderToken",
            FailureReason::InternalServerError => "InternalServerError",
            FailureReason::ServiceUnavailable => "ServiceUnavailable",
            FailureReason::Transport(msg) => msg,
            FailureReason::Unknown(reason) => reason,
        }
    }

    /// 永久失败：令牌本身已不可用，需要从目录中清除
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            FailureReason::BadDeviceToken
                | FailureReason::Unregistered
                | FailureReason::DeviceTokenNotForTopic
        )
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单个令牌的失败记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFailure {
    pub token: String,
    pub reason: FailureReason,
    pub status: Option<u16>,
}

impl TokenFailure {
    pub fn new(token: impl Into<String>, reason: FailureReason, status: Option<u16>) -> Self {
        Self {
            token: token.into(),
            reason,
            status,
        }
    }
}

/// 一次批量发送的逐令牌结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResponse {
    pub sent: Vec<String>,
    pub failed: Vec<TokenFailure>,
}

/// 到某个网关环境的长连接
#[async_trait]
pub trait GatewayConnection: Send + Sync {
    /// 把同一个信封发给一批令牌
    async fn send(&self, envelope: &Envelope, tokens: &[String]) -> Result<BatchResponse>;

    /// 关闭连接，等待在途请求完成
    async fn close(&self);
}

/// 连接工厂，每个环境至多被调用一次
#[async_trait]
pub trait GatewayConnector: Send + Sync {
    async fn connect(&self, env: PushEnvironment) -> Result<Arc<dyn GatewayConnection>>;
}
