use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 通话状态
///
/// 只能单向迁移：`ringing → answered → ended` 或 `ringing → ended`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Ringing,
    Answered,
    Ended,
}

impl CallState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallState::Ringing => "ringing",
            CallState::Answered => "answered",
            CallState::Ended => "ended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ringing" => Some(CallState::Ringing),
            "answered" => Some(CallState::Answered),
            "ended" => Some(CallState::Ended),
            _ => None,
        }
    }

    /// 允许迁移到 `target` 的源状态
    ///
    /// 重复接听会重新打时间戳；`ended` 是终态，没有任何迁移能离开它。
    pub fn sources_for(target: CallState) -> &'static [CallState] {
        match target {
            CallState::Ringing => &[],
            CallState::Answered => &[CallState::Ringing, CallState::Answered],
            CallState::Ended => &[CallState::Ringing, CallState::Answered],
        }
    }

    pub fn can_transition_to(&self, target: CallState) -> bool {
        Self::sources_for(target).contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CallState::Ended)
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通话记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Call {
    pub call_id: String,
    pub caller_identity: String,
    pub callee_identity: String,
    pub room_name: String,
    pub state: CallState,
    pub created_at: DateTime<Utc>,
    pub answered_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// 新建通话
#[derive(Debug, Clone)]
pub struct NewCall {
    pub caller_identity: String,
    pub callee_identity: String,
    pub room_name: String,
}

/// 状态迁移结果，`applied` 为 false 表示终态通话未被改动
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub call: Call,
    pub applied: bool,
}
