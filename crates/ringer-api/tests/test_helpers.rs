#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use ringer_api::{create_router, AppState, JwtAuth};
use ringer_call::{CallRepository, CallService, PushDelivery, PushEndNotifier};
use ringer_device::{DeviceRegistry, PushEnvironment};
use ringer_push::{
    BatchResponse, EnvMode, Envelope, FailureReason, GatewayConnection, GatewayConnector,
    GatewayPool, PushConfig, PushDispatcher, TokenFailure,
};
use sea_orm::{ConnectOptions, Database};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";

/// 记录推送并把 `dead-` 开头的令牌报告为已注销
#[derive(Default)]
pub struct FakeGateway {
    pub sends: Mutex<Vec<(Envelope, Vec<String>)>>,
}

impl FakeGateway {
    pub fn sent_tokens(&self) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, tokens)| tokens.clone())
            .collect()
    }
}

struct FakeConnection(Arc<FakeGateway>);

#[async_trait]
impl GatewayConnection for FakeConnection {
    async fn send(&self, envelope: &Envelope, tokens: &[String]) -> ringer_push::Result<BatchResponse> {
        self.0
            .sends
            .lock()
            .unwrap()
            .push((envelope.clone(), tokens.to_vec()));

        let mut response = BatchResponse::default();
        for token in tokens {
            if token.starts_with("dead-") {
                response.failed.push(TokenFailure::new(
                    token.clone(),
                    FailureReason::Unregistered,
                    Some(410),
                ));
            } else {
                response.sent.push(token.clone());
            }
        }
        Ok(response)
    }

    async fn close(&self) {}
}

struct FakeConnector(Arc<FakeGateway>);

#[async_trait]
impl GatewayConnector for FakeConnector {
    async fn connect(&self, _env: PushEnvironment) -> ringer_push::Result<Arc<dyn GatewayConnection>> {
        Ok(Arc::new(FakeConnection(self.0.clone())))
    }
}

pub struct TestApp {
    pub router: Router,
    pub gateway: Arc<FakeGateway>,
    pub auth: Arc<JwtAuth>,
}

pub fn push_config() -> PushConfig {
    PushConfig {
        key_path: Some(PathBuf::from("/keys/AuthKey.p8")),
        key_id: Some("KEY123".to_string()),
        team_id: Some("TEAM42".to_string()),
        bundle_id: Some("com.example.ringer".to_string()),
        env: EnvMode::Sandbox,
        ..PushConfig::default()
    }
}

pub async fn test_app(auth_required: bool) -> TestApp {
    test_app_with(push_config(), auth_required).await
}

pub async fn test_app_with(config: PushConfig, auth_required: bool) -> TestApp {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to create test database");
    ringer_device::setup_schema(&db).await.unwrap();
    ringer_call::setup_schema(&db).await.unwrap();
    let db = Arc::new(db);

    let registry = Arc::new(DeviceRegistry::new(db.clone()));
    let gateway = Arc::new(FakeGateway::default());
    let pool = Arc::new(GatewayPool::new(
        config.env,
        Arc::new(FakeConnector(gateway.clone())),
    ));
    let dispatcher = Arc::new(PushDispatcher::new(config, pool));
    let delivery = Arc::new(PushDelivery::new(registry.clone(), dispatcher));
    let calls = Arc::new(
        CallService::new(
            Arc::new(CallRepository::new(db)),
            registry.clone(),
            delivery.clone(),
        )
        .with_notifier(Arc::new(PushEndNotifier::new(delivery.clone()))),
    );

    let auth = Arc::new(JwtAuth::new(Some(SECRET.to_string()), auth_required));
    let state = AppState::new(calls, registry, delivery, auth.clone());

    TestApp {
        router: create_router(state),
        gateway,
        auth,
    }
}

impl TestApp {
    pub async fn post(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .uri(uri)
            .method("POST")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = builder
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }
}
