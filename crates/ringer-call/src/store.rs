use crate::{Call, CallState, NewCall, Result, Transition};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// 通话存储
#[async_trait]
pub trait CallStore: Send + Sync {
    /// 确保房间记录存在
    async fn ensure_room(&self, room_name: &str, at: DateTime<Utc>) -> Result<()>;

    /// 查找 `since` 之后创建、仍在振铃的同一被叫同一房间的通话
    async fn find_ringing(
        &self,
        callee_identity: &str,
        room_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Call>>;

    /// 以 `ringing` 状态创建通话
    async fn create(&self, call: NewCall, at: DateTime<Utc>) -> Result<Call>;

    /// 迁移通话状态并打上对应时间戳
    ///
    /// 通话不存在返回 `NotFound`；终态通话再次结束时原样返回且 `applied = false`；
    /// 其余非法迁移返回 `InvalidTransition`。
    async fn transition(&self, call_id: &str, target: CallState, at: DateTime<Utc>) -> Result<Transition>;

    async fn get(&self, call_id: &str) -> Result<Option<Call>>;
}
