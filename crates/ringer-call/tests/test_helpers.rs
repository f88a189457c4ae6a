#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use ringer_call::{
    setup_schema, CallRepository, CallService, Clock, ManualClock, PushDelivery, PushEndNotifier,
};
use ringer_device::{DeviceRegistry, PushEnvironment};
use ringer_push::{
    BatchResponse, EnvMode, Envelope, FailureReason, GatewayConnection, GatewayConnector,
    GatewayPool, PushConfig, PushDispatcher, TokenFailure,
};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// 创建测试用的内存 SQLite 数据库，包含设备与通话两组表
pub async fn create_test_db() -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await?;
    ringer_device::setup_schema(&db).await?;
    setup_schema(&db).await?;
    Ok(db)
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// 一次网关发送的记录
#[derive(Debug, Clone)]
pub struct RecordedSend {
    pub env: PushEnvironment,
    pub envelope: Envelope,
    pub tokens: Vec<String>,
}

/// 记录所有发送并按令牌返回预设失败原因的网关
#[derive(Default)]
pub struct RecordingGateway {
    reasons: Mutex<HashMap<String, String>>,
    sends: Mutex<Vec<RecordedSend>>,
}

impl RecordingGateway {
    pub fn fail_token(&self, token: &str, reason: &str) {
        self.reasons
            .lock()
            .unwrap()
            .insert(token.to_string(), reason.to_string());
    }

    pub fn sends(&self) -> Vec<RecordedSend> {
        self.sends.lock().unwrap().clone()
    }

    pub fn sends_of_type(&self, push_type: &str) -> Vec<RecordedSend> {
        self.sends()
            .into_iter()
            .filter(|send| send.envelope.push_type == push_type)
            .collect()
    }
}

struct RecordingConnection {
    env: PushEnvironment,
    gateway: Arc<RecordingGateway>,
}

#[async_trait]
impl GatewayConnection for RecordingConnection {
    async fn send(&self, envelope: &Envelope, tokens: &[String]) -> ringer_push::Result<BatchResponse> {
        self.gateway.sends.lock().unwrap().push(RecordedSend {
            env: self.env,
            envelope: envelope.clone(),
            tokens: tokens.to_vec(),
        });

        let reasons = self.gateway.reasons.lock().unwrap();
        let mut response = BatchResponse::default();
        for token in tokens {
            match reasons.get(token) {
                Some(reason) => response.failed.push(TokenFailure::new(
                    token.clone(),
                    FailureReason::from_reason(reason),
                    Some(400),
                )),
                None => response.sent.push(token.clone()),
            }
        }
        Ok(response)
    }

    async fn close(&self) {}
}

pub struct RecordingConnector(pub Arc<RecordingGateway>);

#[async_trait]
impl GatewayConnector for RecordingConnector {
    async fn connect(&self, env: PushEnvironment) -> ringer_push::Result<Arc<dyn GatewayConnection>> {
        Ok(Arc::new(RecordingConnection {
            env,
            gateway: self.0.clone(),
        }))
    }
}

pub fn push_config() -> PushConfig {
    PushConfig {
        key_path: Some(PathBuf::from("/keys/AuthKey.p8")),
        key_id: Some("KEY123".to_string()),
        team_id: Some("TEAM42".to_string()),
        bundle_id: Some("com.example.ringer".to_string()),
        env: EnvMode::Both,
        ..PushConfig::default()
    }
}

/// 完整装配好的通话服务
pub struct Harness {
    pub registry: Arc<DeviceRegistry>,
    pub store: Arc<CallRepository>,
    pub gateway: Arc<RecordingGateway>,
    pub clock: Arc<ManualClock>,
    pub delivery: Arc<PushDelivery>,
    pub service: CallService,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(push_config()).await
    }

    pub async fn with_config(config: PushConfig) -> Self {
        let db = Arc::new(create_test_db().await.expect("Failed to create test database"));
        let registry = Arc::new(DeviceRegistry::new(db.clone()));
        let store = Arc::new(CallRepository::new(db));
        let gateway = Arc::new(RecordingGateway::default());
        let clock = Arc::new(ManualClock::new(start_time()));

        let pool = Arc::new(GatewayPool::new(
            config.env,
            Arc::new(RecordingConnector(gateway.clone())),
        ));
        let dispatcher = Arc::new(PushDispatcher::new(config, pool));
        let delivery = Arc::new(PushDelivery::new(registry.clone(), dispatcher));

        let service = CallService::new(store.clone(), registry.clone(), delivery.clone())
            .with_clock(clock.clone() as Arc<dyn Clock>)
            .with_notifier(Arc::new(PushEndNotifier::new(delivery.clone())));

        Self {
            registry,
            store,
            gateway,
            clock,
            delivery,
            service,
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
