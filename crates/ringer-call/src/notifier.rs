use crate::delivery::{PushDelivery, UserPush};
use crate::{Call, Result};
use async_trait::async_trait;
use ringer_push::{PushPayload, WakeChannel};
use std::sync::Arc;
use tracing::debug;

/// 通话结束后通知对方
#[async_trait]
pub trait CallEndNotifier: Send + Sync {
    async fn call_ended(&self, call: &Call) -> Result<()>;
}

/// 通过后台通道给主叫发送结束提醒
pub struct PushEndNotifier {
    delivery: Arc<PushDelivery>,
}

impl PushEndNotifier {
    pub fn new(delivery: Arc<PushDelivery>) -> Self {
        Self { delivery }
    }

    fn payload(call: &Call) -> PushPayload {
        PushPayload::alert("Call ended", "The call has finished")
            .with_data("type", "call_complete")
            .with_data("callId", call.call_id.clone())
    }
}

#[async_trait]
impl CallEndNotifier for PushEndNotifier {
    async fn call_ended(&self, call: &Call) -> Result<()> {
        let result = self
            .delivery
            .push_user(
                &call.caller_identity,
                UserPush {
                    channel: WakeChannel::Background,
                    payload: Self::payload(call),
                    env: None,
                },
            )
            .await?;

        debug!(
            call_id = %call.call_id,
            caller = %call.caller_identity,
            sent = result.sent,
            "Call end notification sent"
        );
        Ok(())
    }
}
