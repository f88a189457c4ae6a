use crate::Result;
use ringer_device::{summarize_token, Device, DeviceDirectory, PushEnvironment};
use ringer_push::{
    ChannelPlan, InterruptionLevel, PushDispatcher, PushJob, PushOutcome, PushPayload, PushTarget,
    WakeChannel,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const CALL_CATEGORY: &str = "INCOMING_CALL";
const INTERACTIVE_SOUND: &str = "incoming_call.caf";
const BACKGROUND_SOUND: &str = "ringtone.caf";

/// 来电推送所需的通话信息
#[derive(Debug, Clone)]
pub struct CallInvitation {
    pub call_id: String,
    pub room_name: String,
    pub caller_identity: String,
    pub caller_name: Option<String>,
    pub callee_identity: String,
}

impl CallInvitation {
    /// 展示给被叫的主叫名称，缺省用主叫身份
    pub fn display_name(&self) -> &str {
        self.caller_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.caller_identity)
    }

    fn data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("callId".to_string(), Value::from(self.call_id.clone()));
        data.insert("roomName".to_string(), Value::from(self.room_name.clone()));
        data.insert("callerName".to_string(), Value::from(self.display_name()));
        data.insert(
            "callerIdentity".to_string(),
            Value::from(self.caller_identity.clone()),
        );
        data
    }

    fn interactive_payload(&self) -> PushPayload {
        PushPayload::new()
            .with_sound(INTERACTIVE_SOUND)
            .with_category(CALL_CATEGORY)
            .with_interruption_level(InterruptionLevel::TimeSensitive)
            .with_data_map(self.data())
    }

    fn background_payload(&self) -> PushPayload {
        PushPayload::alert("Incoming call", format!("{} is calling", self.display_name()))
            .with_sound(BACKGROUND_SOUND)
            .with_interruption_level(InterruptionLevel::TimeSensitive)
            .with_data_map(self.data())
    }
}

/// 单个通道的发送计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTally {
    pub sent: usize,
    pub failed: usize,
}

/// 来电推送结果，按通道拆分
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPushSummary {
    pub sent: usize,
    pub failed: usize,
    /// 被环境模式过滤、未发送的令牌数
    pub dropped: usize,
    pub invalid_tokens: Vec<String>,
    pub interactive: ChannelTally,
    pub background: ChannelTally,
}

impl CallPushSummary {
    fn record(&mut self, channel: WakeChannel, outcome: &PushOutcome) {
        self.sent += outcome.sent;
        self.failed += outcome.failed;
        self.dropped += outcome.dropped;
        self.invalid_tokens.extend(outcome.invalid_tokens.iter().cloned());

        let tally = match channel {
            WakeChannel::Interactive => &mut self.interactive,
            WakeChannel::Background => &mut self.background,
        };
        tally.sent += outcome.sent;
        tally.failed += outcome.failed;
    }
}

/// 定向或广播推送
#[derive(Debug, Clone)]
pub struct UserPush {
    pub channel: WakeChannel,
    pub payload: PushPayload,
    /// 只发给该环境下注册的设备
    pub env: Option<PushEnvironment>,
}

/// 定向或广播推送结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetedPushResult {
    pub sent: usize,
    pub failed: usize,
    pub invalid_tokens: Vec<String>,
    /// 命中的设备数
    pub requested: usize,
}

/// 推送投递
///
/// 连接设备目录与分发器：选通道、发送、把永久失效的令牌写回目录。
pub struct PushDelivery {
    directory: Arc<dyn DeviceDirectory>,
    dispatcher: Arc<PushDispatcher>,
}

impl PushDelivery {
    pub fn new(directory: Arc<dyn DeviceDirectory>, dispatcher: Arc<PushDispatcher>) -> Self {
        Self {
            directory,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Arc<PushDispatcher> {
        &self.dispatcher
    }

    /// 向被叫的所有可达设备发送来电推送
    pub async fn deliver_call(&self, invitation: &CallInvitation) -> Result<CallPushSummary> {
        let devices = self
            .directory
            .list_reachable(&invitation.callee_identity)
            .await?;
        let plan = ChannelPlan::from_devices(&devices);

        debug!(
            callee = %invitation.callee_identity,
            devices = devices.len(),
            interactive = plan.interactive.len(),
            background = plan.background.len(),
            "Call push plan"
        );

        let mut summary = CallPushSummary::default();
        for channel in [WakeChannel::Interactive, WakeChannel::Background] {
            let targets = plan.targets(channel);
            if targets.is_empty() {
                continue;
            }

            let payload = match channel {
                WakeChannel::Interactive => invitation.interactive_payload(),
                WakeChannel::Background => invitation.background_payload(),
            };
            let outcome = self
                .dispatcher
                .dispatch(PushJob::new(targets.to_vec(), channel, payload))
                .await?;

            self.write_back(channel, &outcome.invalid_tokens).await;
            summary.record(channel, &outcome);
        }

        Ok(summary)
    }

    /// 向某个身份的全部设备发送指定通道的推送
    pub async fn push_user(&self, identity: &str, push: UserPush) -> Result<TargetedPushResult> {
        let devices = self
            .directory
            .list_with_token(push.channel.token_kind(), Some(identity), push.env)
            .await?;
        self.push_devices(&devices, push).await
    }

    /// 向所有持有该通道令牌的设备广播
    pub async fn broadcast(&self, push: UserPush) -> Result<TargetedPushResult> {
        let devices = self
            .directory
            .list_with_token(push.channel.token_kind(), None, push.env)
            .await?;
        self.push_devices(&devices, push).await
    }

    async fn push_devices(&self, devices: &[Device], push: UserPush) -> Result<TargetedPushResult> {
        let kind = push.channel.token_kind();
        let targets: Vec<PushTarget> = devices
            .iter()
            .filter_map(|device| {
                device
                    .token(kind)
                    .map(|token| PushTarget::new(token, Some(device.env)))
            })
            .collect();
        let requested = targets.len();

        let outcome = self
            .dispatcher
            .dispatch(PushJob::new(targets, push.channel, push.payload))
            .await?;
        self.write_back(push.channel, &outcome.invalid_tokens).await;

        info!(
            channel = %push.channel,
            requested,
            sent = outcome.sent,
            failed = outcome.failed,
            "Targeted push completed"
        );

        Ok(TargetedPushResult {
            sent: outcome.sent,
            failed: outcome.failed,
            invalid_tokens: outcome.invalid_tokens,
            requested,
        })
    }

    /// 清空失效令牌，失败只记录日志
    async fn write_back(&self, channel: WakeChannel, tokens: &[String]) {
        let kind = channel.token_kind();
        for token in tokens {
            match self.directory.invalidate_token(kind, token).await {
                Ok(rows) => {
                    debug!(
                        kind = kind.as_str(),
                        token = %summarize_token(Some(token)),
                        rows,
                        "Invalid token cleared"
                    );
                }
                Err(e) => {
                    warn!(
                        kind = kind.as_str(),
                        token = %summarize_token(Some(token)),
                        error = %e,
                        "Failed to clear invalid token"
                    );
                }
            }
        }
    }
}
