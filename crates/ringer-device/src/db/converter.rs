use crate::{Device, PushEnvironment, User};

/// 用户实体转换
impl From<super::user::Model> for User {
    fn from(model: super::user::Model) -> Self {
        Self {
            id: model.id,
            identity: model.identity,
            display_name: model.display_name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// 设备实体转换，未知环境标签按 production 处理
impl From<super::device::Model> for Device {
    fn from(model: super::device::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            identity: model.identity,
            platform: model.platform,
            env: PushEnvironment::parse(&model.env).unwrap_or(PushEnvironment::Production),
            apns_token: model.apns_token,
            voip_token: model.voip_token,
            supports_callkit: model.supports_callkit,
            last_seen: model.last_seen,
            created_at: model.created_at,
        }
    }
}
