use crate::clock::{Clock, SystemClock};
use crate::delivery::{CallInvitation, CallPushSummary, PushDelivery};
use crate::lock::KeyedLock;
use crate::notifier::CallEndNotifier;
use crate::{Call, CallError, CallState, CallStore, NewCall, Result};
use ringer_device::DeviceDirectory;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 同一被叫同一房间的振铃通话在该窗口内复用
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(30);

/// 呼叫请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRequest {
    pub caller_identity: String,
    pub caller_name: Option<String>,
    pub callee_identity: String,
    pub room_name: Option<String>,
}

/// 呼叫结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteOutcome {
    pub call_id: String,
    pub room_name: String,
    pub state: CallState,
    pub deduped: bool,
    pub push: CallPushSummary,
}

/// 通话信令服务
pub struct CallService {
    store: Arc<dyn CallStore>,
    directory: Arc<dyn DeviceDirectory>,
    delivery: Arc<PushDelivery>,
    notifier: Option<Arc<dyn CallEndNotifier>>,
    clock: Arc<dyn Clock>,
    locks: KeyedLock,
    dedup_window: chrono::Duration,
}

impl CallService {
    pub fn new(
        store: Arc<dyn CallStore>,
        directory: Arc<dyn DeviceDirectory>,
        delivery: Arc<PushDelivery>,
    ) -> Self {
        Self {
            store,
            directory,
            delivery,
            notifier: None,
            clock: Arc::new(SystemClock),
            locks: KeyedLock::new(),
            dedup_window: chrono::Duration::seconds(DEFAULT_DEDUP_WINDOW.as_secs() as i64),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn CallEndNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_dedup_window(mut self, window: Duration) -> Self {
        self.dedup_window = chrono::Duration::seconds(window.as_secs() as i64);
        self
    }

    /// 发起呼叫
    ///
    /// 窗口内的重复呼叫复用已有通话记录，但仍会重新推送，
    /// 被叫设备可能错过了上一次唤醒。
    pub async fn invite(&self, request: InviteRequest) -> Result<InviteOutcome> {
        let caller_identity = request.caller_identity.trim().to_string();
        let callee_identity = request.callee_identity.trim().to_string();
        if caller_identity.is_empty() {
            return Err(CallError::validation("callerIdentity is required"));
        }
        if callee_identity.is_empty() {
            return Err(CallError::validation("calleeIdentity is required"));
        }

        let room_name = request
            .room_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("call-{}", uuid::Uuid::new_v4()));
        let caller_name = request
            .caller_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);

        let now = self.clock.now();
        self.store.ensure_room(&room_name, now).await?;

        let (call, deduped) = {
            let _guard = self
                .locks
                .acquire(format!("{}\u{1f}{}", callee_identity, room_name))
                .await;

            let since = now - self.dedup_window;
            match self
                .store
                .find_ringing(&callee_identity, &room_name, since)
                .await?
            {
                Some(existing) => (existing, true),
                None => {
                    self.directory
                        .upsert_user(&caller_identity, caller_name.as_deref())
                        .await?;
                    self.directory.upsert_user(&callee_identity, None).await?;

                    let call = self
                        .store
                        .create(
                            NewCall {
                                caller_identity: caller_identity.clone(),
                                callee_identity: callee_identity.clone(),
                                room_name: room_name.clone(),
                            },
                            now,
                        )
                        .await?;
                    (call, false)
                }
            }
        };

        let invitation = CallInvitation {
            call_id: call.call_id.clone(),
            room_name: room_name.clone(),
            caller_identity: caller_identity.clone(),
            caller_name,
            callee_identity: callee_identity.clone(),
        };
        let push = self.delivery.deliver_call(&invitation).await?;

        info!(
            call_id = %call.call_id,
            caller = %caller_identity,
            callee = %callee_identity,
            room = %room_name,
            deduped,
            interactive_sent = push.interactive.sent,
            interactive_failed = push.interactive.failed,
            background_sent = push.background.sent,
            background_failed = push.background.failed,
            "Call invite processed"
        );

        Ok(InviteOutcome {
            call_id: call.call_id,
            room_name,
            state: call.state,
            deduped,
            push,
        })
    }

    /// 接听，重复接听会刷新接听时间
    pub async fn answer(&self, call_id: &str) -> Result<Call> {
        let call_id = Self::require_call_id(call_id)?;
        let transition = self
            .store
            .transition(call_id, CallState::Answered, self.clock.now())
            .await?;

        info!(call_id = %call_id, "Call answered");
        Ok(transition.call)
    }

    /// 挂断，振铃或通话中均可，已结束的通话原样返回
    pub async fn end(&self, call_id: &str) -> Result<Call> {
        let call_id = Self::require_call_id(call_id)?;
        let transition = self
            .store
            .transition(call_id, CallState::Ended, self.clock.now())
            .await?;

        if transition.applied {
            info!(call_id = %call_id, "Call ended");
            if let Some(notifier) = &self.notifier {
                let notifier = notifier.clone();
                let call = transition.call.clone();
                tokio::spawn(async move {
                    if let Err(e) = notifier.call_ended(&call).await {
                        warn!(call_id = %call.call_id, error = %e, "Call end notification failed");
                    }
                });
            }
        }

        Ok(transition.call)
    }

    pub async fn get(&self, call_id: &str) -> Result<Call> {
        let call_id = Self::require_call_id(call_id)?;
        self.store
            .get(call_id)
            .await?
            .ok_or_else(|| CallError::NotFound(call_id.to_string()))
    }

    fn require_call_id(call_id: &str) -> Result<&str> {
        let call_id = call_id.trim();
        if call_id.is_empty() {
            return Err(CallError::validation("callId is required"));
        }
        Ok(call_id)
    }
}
