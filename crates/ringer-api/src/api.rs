use crate::{auth, handlers, state::AppState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// 创建 API 路由
pub fn create_router(state: AppState) -> Router {
    let v1 = Router::new()
        // 通话信令
        .route("/v1/calls/invite", post(handlers::invite_call))
        .route("/v1/calls/answer", post(handlers::answer_call))
        .route("/v1/calls/end", post(handlers::end_call))
        .route("/v1/calls/:call_id", get(handlers::get_call))
        // 设备注册
        .route("/v1/devices/register", post(handlers::register_device))
        // 推送
        .route("/v1/push/user", post(handlers::push_user))
        .route("/v1/push/broadcast", post(handlers::broadcast))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        // 健康检查
        .route("/health", get(health_check))
        .merge(v1)
        // 添加中间件
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 健康检查
async fn health_check() -> &'static str {
    "OK"
}
