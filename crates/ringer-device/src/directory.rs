use crate::{Device, DeviceRegistration, PushEnvironment, Result, TokenKind, User};
use async_trait::async_trait;

/// 设备目录
///
/// 推送核心只通过该接口读取设备、写回失效令牌。
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// 按身份插入或更新用户，`display_name` 为 `None` 时保留原值
    async fn upsert_user(&self, identity: &str, display_name: Option<&str>) -> Result<User>;

    /// 注册设备令牌，令牌若属于其他行会被迁移到本次注册的设备上
    async fn register(&self, registration: DeviceRegistration) -> Result<Device>;

    /// 某身份下所有至少持有一个令牌的设备
    async fn list_reachable(&self, identity: &str) -> Result<Vec<Device>>;

    /// 持有指定种类令牌的设备，可按身份、环境过滤
    async fn list_with_token(
        &self,
        kind: TokenKind,
        identity: Option<&str>,
        env: Option<PushEnvironment>,
    ) -> Result<Vec<Device>>;

    /// 清空失效令牌所在的字段（不删除设备行），返回受影响行数
    async fn invalidate_token(&self, kind: TokenKind, token: &str) -> Result<u64>;

    /// 删除用户及其全部设备，返回删除的设备数
    async fn delete_user(&self, identity: &str) -> Result<u64>;
}
