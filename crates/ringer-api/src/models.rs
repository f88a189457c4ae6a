use crate::error::{ApiError, Result};
use ringer_device::{Device, PushEnvironment};
use ringer_push::WakeChannel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 发起呼叫请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteCallRequest {
    pub caller_identity: Option<String>,
    pub caller_name: Option<String>,
    pub callee_identity: Option<String>,
    pub room_name: Option<String>,
}

/// 接听 / 挂断请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallIdRequest {
    pub call_id: Option<String>,
}

impl CallIdRequest {
    pub fn require(&self) -> Result<&str> {
        self.call_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::validation("callId is required"))
    }
}

/// 注册设备请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceRequest {
    pub identity: Option<String>,
    pub display_name: Option<String>,
    pub platform: Option<String>,
    pub env: Option<String>,
    pub apns_token: Option<String>,
    pub voip_token: Option<String>,
    pub supports_call_kit: Option<bool>,
}

/// 注册结果摘要
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceResponse {
    pub device_id: String,
    pub identity: String,
    pub platform: String,
    pub env: PushEnvironment,
    pub has_apns_token: bool,
    pub has_voip_token: bool,
    pub supports_call_kit: bool,
}

impl From<Device> for RegisterDeviceResponse {
    fn from(device: Device) -> Self {
        Self {
            has_apns_token: device.apns_token.is_some(),
            has_voip_token: device.voip_token.is_some(),
            device_id: device.id,
            identity: device.identity,
            platform: device.platform,
            env: device.env,
            supports_call_kit: device.supports_callkit,
        }
    }
}

/// 推送类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PushKind {
    Alert,
    Voip,
}

impl From<PushKind> for WakeChannel {
    fn from(kind: PushKind) -> Self {
        match kind {
            PushKind::Alert => WakeChannel::Background,
            PushKind::Voip => WakeChannel::Interactive,
        }
    }
}

/// 定向推送请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushUserRequest {
    pub identity: Option<String>,
    #[serde(rename = "type")]
    pub kind: PushKind,
    pub title: Option<String>,
    pub body: Option<String>,
    pub payload: Option<Map<String, Value>>,
    pub env: Option<String>,
}

/// 广播推送请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    #[serde(rename = "type")]
    pub kind: PushKind,
    pub title: Option<String>,
    pub body: Option<String>,
    pub payload: Option<Map<String, Value>>,
    pub env: Option<String>,
}

/// 去掉首尾空白，空串视为未提供
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// 解析可选的环境标签
pub fn parse_env(value: Option<&str>) -> Result<Option<PushEnvironment>> {
    match non_blank(value) {
        None => Ok(None),
        Some(raw) => PushEnvironment::parse(&raw)
            .map(Some)
            .ok_or_else(|| ApiError::validation(format!("unknown env: {}", raw))),
    }
}
