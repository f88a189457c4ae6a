use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DeviceError, Result};

/// 推送网关部署环境
///
/// 令牌与连接都绑定在某个环境上，两个环境之间不能混用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushEnvironment {
    #[serde(alias = "prod")]
    Production,
    Sandbox,
}

impl PushEnvironment {
    pub fn as_str(&self) -> &'static str {
        match self {
            PushEnvironment::Production => "production",
            PushEnvironment::Sandbox => "sandbox",
        }
    }

    /// 解析环境标签，`prod` 视为 `production` 的别名
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(PushEnvironment::Production),
            "sandbox" => Some(PushEnvironment::Sandbox),
            _ => None,
        }
    }
}

impl fmt::Display for PushEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 令牌种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// 静默唤醒令牌（普通 APNs 令牌）
    Apns,
    /// 交互式唤醒令牌（VoIP 令牌）
    Voip,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Apns => "apns",
            TokenKind::Voip => "voip",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 设备所属用户
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub identity: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 设备注册记录
///
/// 一台物理设备对某个用户身份的可达性。每个非空令牌值在全表唯一。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub user_id: String,
    pub identity: String,
    pub platform: String,
    pub env: PushEnvironment,
    pub apns_token: Option<String>,
    pub voip_token: Option<String>,
    /// 能否展示原生来电界面
    pub supports_callkit: bool,
    pub last_seen: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Device {
    /// 获取指定种类的令牌（空字符串视为不存在）
    pub fn token(&self, kind: TokenKind) -> Option<&str> {
        let token = match kind {
            TokenKind::Apns => self.apns_token.as_deref(),
            TokenKind::Voip => self.voip_token.as_deref(),
        };
        token.filter(|t| !t.is_empty())
    }

    /// 是否还持有任一可用令牌
    pub fn is_reachable(&self) -> bool {
        self.token(TokenKind::Apns).is_some() || self.token(TokenKind::Voip).is_some()
    }
}

/// 设备注册请求
#[derive(Debug, Clone)]
pub struct DeviceRegistration {
    pub identity: String,
    pub display_name: Option<String>,
    pub platform: String,
    pub env: PushEnvironment,
    pub apns_token: Option<String>,
    pub voip_token: Option<String>,
    pub supports_callkit: bool,
}

impl DeviceRegistration {
    pub fn new(identity: impl Into<String>, env: PushEnvironment) -> Self {
        Self {
            identity: identity.into(),
            display_name: None,
            platform: "ios".to_string(),
            env,
            apns_token: None,
            voip_token: None,
            supports_callkit: true,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_apns_token(mut self, token: impl Into<String>) -> Self {
        self.apns_token = Some(token.into());
        self
    }

    pub fn with_voip_token(mut self, token: impl Into<String>) -> Self {
        self.voip_token = Some(token.into());
        self
    }

    pub fn with_callkit(mut self, supports_callkit: bool) -> Self {
        self.supports_callkit = supports_callkit;
        self
    }

    /// 校验注册信息：身份必填，至少携带一个令牌
    pub fn validate(&self) -> Result<()> {
        if self.identity.trim().is_empty() {
            return Err(DeviceError::validation("identity is required"));
        }
        let has_apns = self.apns_token.as_deref().is_some_and(|t| !t.trim().is_empty());
        let has_voip = self.voip_token.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_apns && !has_voip {
            return Err(DeviceError::validation("apnsToken or voipToken is required"));
        }
        Ok(())
    }
}

/// 日志中使用的令牌摘要，避免输出完整令牌
pub fn summarize_token(token: Option<&str>) -> String {
    match token {
        None | Some("") => "none".to_string(),
        Some(token) => {
            let suffix = token
                .char_indices()
                .rev()
                .nth(5)
                .map(|(i, _)| &token[i..])
                .unwrap_or(token);
            format!("len={}..{}", token.len(), suffix)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(apns: Option<&str>, voip: Option<&str>) -> Device {
        let now = Utc::now();
        Device {
            id: "dev_1".to_string(),
            user_id: "usr_1".to_string(),
            identity: "alice".to_string(),
            platform: "ios".to_string(),
            env: PushEnvironment::Production,
            apns_token: apns.map(str::to_string),
            voip_token: voip.map(str::to_string),
            supports_callkit: true,
            last_seen: now,
            created_at: now,
        }
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(PushEnvironment::parse("prod"), Some(PushEnvironment::Production));
        assert_eq!(PushEnvironment::parse("Production"), Some(PushEnvironment::Production));
        assert_eq!(PushEnvironment::parse("sandbox"), Some(PushEnvironment::Sandbox));
        assert_eq!(PushEnvironment::parse("staging"), None);
    }

    #[test]
    fn test_empty_token_is_absent() {
        let d = device(Some(""), Some("voip-1"));
        assert_eq!(d.token(TokenKind::Apns), None);
        assert_eq!(d.token(TokenKind::Voip), Some("voip-1"));
        assert!(d.is_reachable());
        assert!(!device(None, Some("")).is_reachable());
    }

    #[test]
    fn test_registration_requires_token() {
        let reg = DeviceRegistration::new("alice", PushEnvironment::Production);
        assert!(matches!(reg.validate(), Err(DeviceError::ValidationError(_))));

        let reg = reg.with_voip_token("abc");
        assert!(reg.validate().is_ok());

        let reg = DeviceRegistration::new("  ", PushEnvironment::Sandbox).with_apns_token("abc");
        assert!(reg.validate().is_err());
    }

    #[test]
    fn test_summarize_token() {
        assert_eq!(summarize_token(None), "none");
        assert_eq!(summarize_token(Some("0123456789abcdef")), "len=16..abcdef");
        assert_eq!(summarize_token(Some("abc")), "len=3..abc");
    }
}
