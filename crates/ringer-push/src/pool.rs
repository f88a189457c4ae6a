use crate::config::EnvMode;
use crate::gateway::{GatewayConnection, GatewayConnector};
use crate::{PushError, Result};
use ringer_device::PushEnvironment;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// 网关连接池
///
/// 每个环境最多一条连接，首次使用时建立并在进程内复用；
/// 并发的首次调用只会触发一次建连。
pub struct GatewayPool {
    mode: EnvMode,
    connector: Arc<dyn GatewayConnector>,
    production: OnceCell<Arc<dyn GatewayConnection>>,
    sandbox: OnceCell<Arc<dyn GatewayConnection>>,
    closed: AtomicBool,
}

impl GatewayPool {
    pub fn new(mode: EnvMode, connector: Arc<dyn GatewayConnector>) -> Self {
        Self {
            mode,
            connector,
            production: OnceCell::new(),
            sandbox: OnceCell::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> EnvMode {
        self.mode
    }

    pub fn default_environment(&self) -> PushEnvironment {
        self.mode.default_environment()
    }

    pub fn resolve(&self, tag: Option<PushEnvironment>) -> Option<PushEnvironment> {
        self.mode.resolve(tag)
    }

    fn slot(&self, env: PushEnvironment) -> &OnceCell<Arc<dyn GatewayConnection>> {
        match env {
            PushEnvironment::Production => &self.production,
            PushEnvironment::Sandbox => &self.sandbox,
        }
    }

    /// 获取（必要时建立）指定环境的连接
    pub async fn connection(&self, env: PushEnvironment) -> Result<Arc<dyn GatewayConnection>> {
        if self.is_closed() {
            return Err(PushError::Closed);
        }

        let connection = self
            .slot(env)
            .get_or_try_init(|| async {
                info!(env = %env, "Opening push gateway connection");
                self.connector.connect(env).await
            })
            .await?;

        Ok(Arc::clone(connection))
    }

    /// 关闭全部已建立的连接，重复调用无副作用
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Push gateway pool already closed");
            return;
        }

        for (env, slot) in [
            (PushEnvironment::Production, &self.production),
            (PushEnvironment::Sandbox, &self.sandbox),
        ] {
            if let Some(connection) = slot.get() {
                connection.close().await;
                info!(env = %env, "Push gateway connection closed");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
