use crate::{
    auth::Claims,
    error::{ApiError, Result},
    models::*,
    state::AppState,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use ringer_device::DeviceRegistration;
use tracing::info;

/// 注册设备
pub async fn register_device(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Json(req): Json<RegisterDeviceRequest>,
) -> Result<(StatusCode, Json<RegisterDeviceResponse>)> {
    let identity = non_blank(req.identity.as_deref())
        .or_else(|| claims.map(|Extension(c)| c.sub))
        .ok_or_else(|| ApiError::validation("identity is required"))?;
    let env = parse_env(req.env.as_deref())?.unwrap_or_else(|| state.default_environment());

    let mut registration = DeviceRegistration::new(identity, env);
    if let Some(platform) = non_blank(req.platform.as_deref()) {
        registration = registration.with_platform(platform);
    }
    if let Some(name) = non_blank(req.display_name.as_deref()) {
        registration = registration.with_display_name(name);
    }
    if let Some(token) = non_blank(req.apns_token.as_deref()) {
        registration = registration.with_apns_token(token);
    }
    if let Some(token) = non_blank(req.voip_token.as_deref()) {
        registration = registration.with_voip_token(token);
    }
    if let Some(callkit) = req.supports_call_kit {
        registration = registration.with_callkit(callkit);
    }

    let device = state.devices.register(registration).await?;
    info!(device_id = %device.id, identity = %device.identity, env = %device.env, "Device registered");

    Ok((StatusCode::CREATED, Json(RegisterDeviceResponse::from(device))))
}
