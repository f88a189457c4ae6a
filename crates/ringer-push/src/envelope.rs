use crate::channel::WakeChannel;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// 通知在网关侧的有效期
pub const EXPIRY_SECS: i64 = 60 * 60;

/// 最高投递优先级
pub const PRIORITY_IMMEDIATE: u8 = 10;

/// 中断级别提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterruptionLevel {
    Passive,
    Active,
    TimeSensitive,
    Critical,
}

impl InterruptionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterruptionLevel::Passive => "passive",
            InterruptionLevel::Active => "active",
            InterruptionLevel::TimeSensitive => "time-sensitive",
            InterruptionLevel::Critical => "critical",
        }
    }
}

/// 推送内容
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
    pub sound: Option<String>,
    pub category: Option<String>,
    pub interruption_level: Option<InterruptionLevel>,
    /// 与 `aps` 并列的自定义数据，原样透传给客户端
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl PushPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alert(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn with_sound(mut self, sound: impl Into<String>) -> Self {
        self.sound = Some(sound.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_interruption_level(mut self, level: InterruptionLevel) -> Self {
        self.interruption_level = Some(level);
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn with_data_map(mut self, data: Map<String, Value>) -> Self {
        self.data.extend(data);
        self
    }
}

/// 发往网关的通知信封
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub topic: String,
    pub push_type: &'static str,
    pub priority: u8,
    /// 过期时间（Unix 秒）
    pub expiration: i64,
    pub payload: Value,
}

impl Envelope {
    pub fn build(
        topic: impl Into<String>,
        channel: WakeChannel,
        payload: &PushPayload,
        now: DateTime<Utc>,
    ) -> Self {
        let mut aps = Map::new();

        if channel == WakeChannel::Background {
            if payload.title.is_some() || payload.body.is_some() {
                aps.insert(
                    "alert".to_string(),
                    json!({
                        "title": payload.title.clone().unwrap_or_default(),
                        "body": payload.body.clone().unwrap_or_default(),
                    }),
                );
            }
            aps.insert(
                "sound".to_string(),
                Value::from(payload.sound.clone().unwrap_or_else(|| "default".to_string())),
            );
        } else if let Some(sound) = &payload.sound {
            aps.insert("sound".to_string(), Value::from(sound.clone()));
        }

        if let Some(category) = &payload.category {
            aps.insert("category".to_string(), Value::from(category.clone()));
        }
        if let Some(level) = payload.interruption_level {
            aps.insert("interruption-level".to_string(), Value::from(level.as_str()));
        }
        // 允许应用在挂起状态下被唤醒
        aps.insert("content-available".to_string(), Value::from(1));

        let mut body = payload.data.clone();
        body.insert("aps".to_string(), Value::Object(aps));

        Self {
            topic: topic.into(),
            push_type: channel.push_type(),
            priority: PRIORITY_IMMEDIATE,
            expiration: (now + Duration::seconds(EXPIRY_SECS)).timestamp(),
            payload: Value::Object(body),
        }
    }
}
