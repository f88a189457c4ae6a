use anyhow::{Context, Result};
use ringer_api::{AppState, JwtAuth};
use ringer_call::{CallRepository, CallService, PushDelivery, PushEndNotifier};
use ringer_config::AppConfig;
use ringer_device::DeviceRegistry;
use ringer_push::{GatewayConnector, GatewayPool, PushDispatcher};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tracing::{info, warn};

/// 装配完成的服务
pub struct Services {
    pub state: AppState,
    /// 关闭时需要显式释放的网关连接
    pub pool: Arc<GatewayPool>,
}

/// 连接数据库并创建表结构
pub async fn connect_database(url: &str) -> Result<Arc<DatabaseConnection>> {
    let mut options = ConnectOptions::new(url.to_string());
    options.sqlx_logging(false);
    if url.starts_with("sqlite::memory:") {
        // 内存库的每个连接都是独立的库
        options.max_connections(1);
    }

    let db = Database::connect(options).await?;
    ringer_device::setup_schema(&db).await?;
    ringer_call::setup_schema(&db).await?;

    info!("Database ready");
    Ok(Arc::new(db))
}

/// 按配置装配各组件
pub fn build_services(
    config: &AppConfig,
    db: Arc<DatabaseConnection>,
    connector: Arc<dyn GatewayConnector>,
) -> Services {
    if !config.push.is_configured() {
        warn!("Push gateway credentials missing, dispatches will fail until configured");
    }

    let registry = Arc::new(DeviceRegistry::new(db.clone()));
    let pool = Arc::new(GatewayPool::new(config.push.env, connector));
    let dispatcher = Arc::new(PushDispatcher::new(config.push.clone(), pool.clone()));
    let delivery = Arc::new(PushDelivery::new(registry.clone(), dispatcher));

    let calls = CallService::new(
        Arc::new(CallRepository::new(db)),
        registry.clone(),
        delivery.clone(),
    )
    .with_dedup_window(config.calls.dedup_window())
    .with_notifier(Arc::new(PushEndNotifier::new(delivery.clone())));

    let auth = Arc::new(JwtAuth::new(
        config.auth.jwt_secret.clone(),
        config.auth.required,
    ));

    info!(
        env_mode = ?config.push.env,
        auth_required = config.auth.required,
        dedup_window_secs = config.calls.dedup_window_secs,
        "Services assembled"
    );

    Services {
        state: AppState::new(Arc::new(calls), registry, delivery, auth),
        pool,
    }
}

/// 用配置中的密钥为本地调试签发一个 Bearer 令牌
pub fn issue_token(
    config: &AppConfig,
    identity: &str,
    name: Option<&str>,
    ttl_hours: i64,
) -> Result<String> {
    let auth = JwtAuth::new(config.auth.jwt_secret.clone(), config.auth.required);
    auth.generate_token(identity, name, ttl_hours)
        .context("Failed to issue token")
}
