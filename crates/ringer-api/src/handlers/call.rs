use crate::{
    auth::Claims,
    error::{ApiError, Result},
    models::*,
    state::AppState,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use ringer_call::{Call, InviteOutcome, InviteRequest};
use tracing::debug;

/// 发起呼叫
pub async fn invite_call(
    State(state): State<AppState>,
    claims: Option<Extension<Claims>>,
    Json(req): Json<InviteCallRequest>,
) -> Result<Json<InviteOutcome>> {
    let claims = claims.map(|Extension(c)| c);

    let callee_identity = non_blank(req.callee_identity.as_deref())
        .ok_or_else(|| ApiError::validation("calleeIdentity is required"))?;
    let caller_identity = non_blank(req.caller_identity.as_deref())
        .or_else(|| claims.as_ref().map(|c| c.sub.clone()))
        .ok_or_else(|| ApiError::validation("callerIdentity is required"))?;
    let caller_name = non_blank(req.caller_name.as_deref())
        .or_else(|| claims.as_ref().and_then(|c| non_blank(c.name.as_deref())));

    let outcome = state
        .calls
        .invite(InviteRequest {
            caller_identity,
            caller_name,
            callee_identity,
            room_name: req.room_name,
        })
        .await?;

    Ok(Json(outcome))
}

/// 接听
pub async fn answer_call(
    State(state): State<AppState>,
    Json(req): Json<CallIdRequest>,
) -> Result<Json<Call>> {
    let call = state.calls.answer(req.require()?).await?;
    Ok(Json(call))
}

/// 挂断
pub async fn end_call(
    State(state): State<AppState>,
    Json(req): Json<CallIdRequest>,
) -> Result<Json<Call>> {
    let call = state.calls.end(req.require()?).await?;
    Ok(Json(call))
}

/// 查询通话
pub async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<String>,
) -> Result<Json<Call>> {
    debug!(call_id = %call_id, "Getting call");
    let call = state.calls.get(&call_id).await?;
    Ok(Json(call))
}
