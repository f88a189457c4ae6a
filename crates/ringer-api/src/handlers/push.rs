use crate::{
    auth::Claims,
    error::{ApiError, Result},
    models::*,
    state::AppState,
};
use axum::{extract::State, Extension, Json};
use ringer_call::{TargetedPushResult, UserPush};
use ringer_push::PushPayload;
use serde_json::{Map, Value};

fn build_payload(title: Option<String>, body: Option<String>, data: Option<Map<String, Value>>) -> PushPayload {
    PushPayload {
        title,
        body,
        data: data.unwrap_or_default(),
        ..PushPayload::default()
    }
}

/// 向单个身份推送
pub async fn push_user(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Json(req): Json<PushUserRequest>,
) -> Result<Json<TargetedPushResult>> {
    let identity = non_blank(req.identity.as_deref())
        .or_else(|| claims.map(|Extension(c)| c.sub))
        .ok_or_else(|| ApiError::validation("identity is required"))?;

    let push = UserPush {
        channel: req.kind.into(),
        env: parse_env(req.env.as_deref())?,
        payload: build_payload(req.title, req.body, req.payload),
    };

    let result = state.delivery.push_user(&identity, push).await?;
    Ok(Json(result))
}

/// 广播推送
pub async fn broadcast(
    State(state): State<AppState>,
    Json(req): Json<BroadcastRequest>,
) -> Result<Json<TargetedPushResult>> {
    let push = UserPush {
        channel: req.kind.into(),
        env: parse_env(req.env.as_deref())?,
        payload: build_payload(req.title, req.body, req.payload),
    };

    let result = state.delivery.broadcast(push).await?;
    Ok(Json(result))
}
