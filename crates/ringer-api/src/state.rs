use crate::auth::JwtAuth;
use ringer_call::{CallService, PushDelivery};
use ringer_device::{DeviceDirectory, PushEnvironment};
use std::sync::Arc;

/// API 应用状态
#[derive(Clone)]
pub struct AppState {
    /// 通话信令
    pub calls: Arc<CallService>,
    /// 设备目录
    pub devices: Arc<dyn DeviceDirectory>,
    /// 定向与广播推送
    pub delivery: Arc<PushDelivery>,
    pub auth: Arc<JwtAuth>,
}

impl AppState {
    pub fn new(
        calls: Arc<CallService>,
        devices: Arc<dyn DeviceDirectory>,
        delivery: Arc<PushDelivery>,
        auth: Arc<JwtAuth>,
    ) -> Self {
        Self {
            calls,
            devices,
            delivery,
            auth,
        }
    }

    /// 注册时未指定环境使用的默认值，由网关环境模式决定
    pub fn default_environment(&self) -> PushEnvironment {
        self.delivery.dispatcher().default_environment()
    }
}
