use ringer_device::{Device, PushEnvironment, TokenKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 唤醒通道
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WakeChannel {
    /// 交互式唤醒：系统可以展示原生来电界面（VoIP 推送）
    Interactive,
    /// 后台唤醒：普通 alert 推送，作为无法展示来电界面时的兜底
    Background,
}

impl WakeChannel {
    /// 网关的 push-type 头
    pub fn push_type(&self) -> &'static str {
        match self {
            WakeChannel::Interactive => "voip",
            WakeChannel::Background => "alert",
        }
    }

    /// 通道使用的令牌种类，写回失效令牌时按它清空对应字段
    pub fn token_kind(&self) -> TokenKind {
        match self {
            WakeChannel::Interactive => TokenKind::Voip,
            WakeChannel::Background => TokenKind::Apns,
        }
    }
}

impl fmt::Display for WakeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WakeChannel::Interactive => f.write_str("interactive"),
            WakeChannel::Background => f.write_str("background"),
        }
    }
}

/// 推送目标：令牌 + 环境标签
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushTarget {
    pub token: String,
    pub env: Option<PushEnvironment>,
}

impl PushTarget {
    pub fn new(token: impl Into<String>, env: Option<PushEnvironment>) -> Self {
        Self {
            token: token.into(),
            env,
        }
    }
}

/// 为单台设备选择唤醒通道
///
/// 支持来电界面且持有 VoIP 令牌时走交互式通道，否则退回到普通令牌；
/// 两个令牌都不可用的设备返回 `None`。
pub fn select_channel(device: &Device) -> Option<(WakeChannel, PushTarget)> {
    if device.supports_callkit {
        if let Some(token) = device.token(TokenKind::Voip) {
            return Some((
                WakeChannel::Interactive,
                PushTarget::new(token, Some(device.env)),
            ));
        }
    }

    device
        .token(TokenKind::Apns)
        .map(|token| (WakeChannel::Background, PushTarget::new(token, Some(device.env))))
}

/// 按通道划分后的扇出计划，每台可达设备恰好出现一次
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelPlan {
    pub interactive: Vec<PushTarget>,
    pub background: Vec<PushTarget>,
}

impl ChannelPlan {
    pub fn from_devices<'a>(devices: impl IntoIterator<Item = &'a Device>) -> Self {
        let mut plan = ChannelPlan::default();
        for device in devices {
            match select_channel(device) {
                Some((WakeChannel::Interactive, target)) => plan.interactive.push(target),
                Some((WakeChannel::Background, target)) => plan.background.push(target),
                None => {}
            }
        }
        plan
    }

    pub fn targets(&self, channel: WakeChannel) -> &[PushTarget] {
        match channel {
            WakeChannel::Interactive => &self.interactive,
            WakeChannel::Background => &self.background,
        }
    }

    pub fn len(&self) -> usize {
        self.interactive.len() + self.background.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
