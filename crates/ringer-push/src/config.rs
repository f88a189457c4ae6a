use crate::channel::WakeChannel;
use crate::{PushError, Result};
use ringer_device::PushEnvironment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 网关环境模式，进程启动时确定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvMode {
    /// 只发生产环境，sandbox 令牌直接丢弃
    #[default]
    #[serde(alias = "prod")]
    Production,
    /// 只发 sandbox 环境，生产令牌直接丢弃
    Sandbox,
    /// 按令牌自身标签路由，未标注的走生产环境
    Both,
}

impl EnvMode {
    /// 注册设备时未指定环境所使用的默认值
    pub fn default_environment(&self) -> PushEnvironment {
        match self {
            EnvMode::Sandbox => PushEnvironment::Sandbox,
            EnvMode::Production | EnvMode::Both => PushEnvironment::Production,
        }
    }

    /// 解析令牌应发往的环境，`None` 表示被当前模式过滤掉
    pub fn resolve(&self, tag: Option<PushEnvironment>) -> Option<PushEnvironment> {
        match (self, tag) {
            (EnvMode::Both, tag) => Some(tag.unwrap_or(PushEnvironment::Production)),
            (EnvMode::Production, Some(PushEnvironment::Sandbox)) => None,
            (EnvMode::Sandbox, Some(PushEnvironment::Production)) => None,
            (mode, tag) => Some(tag.unwrap_or_else(|| mode.default_environment())),
        }
    }
}

/// 推送网关配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// .p8 签名密钥路径
    pub key_path: Option<PathBuf>,
    pub key_id: Option<String>,
    pub team_id: Option<String>,
    /// 应用 bundle id，即普通推送的 topic
    pub bundle_id: Option<String>,
    /// VoIP topic，缺省为 `<bundle_id>.voip`
    pub voip_topic: Option<String>,
    pub env: EnvMode,
    /// 单次网关调用超时（秒）
    pub request_timeout_secs: u64,
    /// 并行处理的分块数上限
    pub max_concurrent_chunks: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            key_path: None,
            key_id: None,
            team_id: None,
            bundle_id: None,
            voip_topic: None,
            env: EnvMode::default(),
            request_timeout_secs: 10,
            max_concurrent_chunks: 4,
        }
    }
}

impl PushConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// 取出完整的网关凭据，缺任何一项都视为未配置
    pub fn credentials(&self) -> Result<GatewayCredentials> {
        let mut missing = Vec::new();
        let key_path = self.key_path.clone().filter(|p| !p.as_os_str().is_empty());
        if key_path.is_none() {
            missing.push("APNS_KEY_PATH");
        }
        let key_id = non_empty(&self.key_id);
        if key_id.is_none() {
            missing.push("APNS_KEY_ID");
        }
        let team_id = non_empty(&self.team_id);
        if team_id.is_none() {
            missing.push("APNS_TEAM_ID");
        }
        let bundle_id = non_empty(&self.bundle_id);
        if bundle_id.is_none() {
            missing.push("APNS_BUNDLE_ID");
        }

        match (key_path, key_id, team_id, bundle_id) {
            (Some(key_path), Some(key_id), Some(team_id), Some(bundle_id)) => {
                Ok(GatewayCredentials {
                    key_path,
                    key_id,
                    team_id,
                    bundle_id,
                    voip_topic: non_empty(&self.voip_topic),
                })
            }
            _ => Err(PushError::NotConfigured(missing.join(", "))),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_ok()
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 校验过的网关凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayCredentials {
    pub key_path: PathBuf,
    pub key_id: String,
    pub team_id: String,
    pub bundle_id: String,
    pub voip_topic: Option<String>,
}

impl GatewayCredentials {
    /// 按唤醒通道推导 topic
    pub fn topic(&self, channel: WakeChannel) -> String {
        match channel {
            WakeChannel::Interactive => self
                .voip_topic
                .clone()
                .unwrap_or_else(|| format!("{}.voip", self.bundle_id)),
            WakeChannel::Background => self.bundle_id.clone(),
        }
    }
}
