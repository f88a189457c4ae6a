use crate::config::PushConfig;
use crate::envelope::Envelope;
use crate::gateway::{BatchResponse, FailureReason, GatewayConnection, GatewayConnector, TokenFailure};
use crate::{PushError, Result};
use async_trait::async_trait;
use futures::future::join_all;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::Client;
use ringer_device::{summarize_token, PushEnvironment};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

const PRODUCTION_ENDPOINT: &str = "https://api.push.apple.com";
const SANDBOX_ENDPOINT: &str = "https://api.sandbox.push.apple.com";

/// 提供者令牌的复用时长，网关要求一小时内轮换
const PROVIDER_TOKEN_TTL: Duration = Duration::from_secs(50 * 60);

/// 基于 HTTP/2 的网关连接器
pub struct ApnsConnector {
    config: PushConfig,
}

impl ApnsConnector {
    pub fn new(config: PushConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl GatewayConnector for ApnsConnector {
    async fn connect(&self, env: PushEnvironment) -> Result<Arc<dyn GatewayConnection>> {
        let credentials = self.config.credentials()?;

        let pem = tokio::fs::read(&credentials.key_path).await.map_err(|e| {
            PushError::InvalidKey(format!("{}: {}", credentials.key_path.display(), e))
        })?;
        let key = EncodingKey::from_ec_pem(&pem).map_err(|e| PushError::InvalidKey(e.to_string()))?;

        let client = Client::builder()
            .http2_prior_knowledge()
            .timeout(self.config.request_timeout())
            .build()
            .map_err(|e| PushError::Gateway(e.to_string()))?;

        let endpoint = match env {
            PushEnvironment::Production => PRODUCTION_ENDPOINT,
            PushEnvironment::Sandbox => SANDBOX_ENDPOINT,
        };

        debug!(env = %env, endpoint = endpoint, "Gateway client ready");

        Ok(Arc::new(ApnsConnection {
            client,
            endpoint: endpoint.to_string(),
            provider: ProviderToken::new(key, credentials.key_id, credentials.team_id),
            closed: RwLock::new(false),
        }))
    }
}

#[derive(Debug, Serialize)]
struct ProviderClaims<'a> {
    iss: &'a str,
    iat: i64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    reason: String,
}

/// 提供者令牌缓存
struct ProviderToken {
    key: EncodingKey,
    key_id: String,
    team_id: String,
    cached: Mutex<Option<(String, Instant)>>,
}

impl ProviderToken {
    fn new(key: EncodingKey, key_id: String, team_id: String) -> Self {
        Self {
            key,
            key_id,
            team_id,
            cached: Mutex::new(None),
        }
    }

    async fn bearer(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some((token, issued)) = cached.as_ref() {
            if issued.elapsed() < PROVIDER_TOKEN_TTL {
                return Ok(token.clone());
            }
        }

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        let claims = ProviderClaims {
            iss: &self.team_id,
            iat: chrono::Utc::now().timestamp(),
        };
        let token = jsonwebtoken::encode(&header, &claims, &self.key)
            .map_err(|e| PushError::InvalidKey(e.to_string()))?;

        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }
}

/// 单个环境的网关连接
pub struct ApnsConnection {
    client: Client,
    endpoint: String,
    provider: ProviderToken,
    /// 发送持有读锁，关闭获取写锁以等待在途请求
    closed: RwLock<bool>,
}

impl ApnsConnection {
    async fn send_one(&self, bearer: &str, envelope: &Envelope, token: &str) -> std::result::Result<(), TokenFailure> {
        let url = format!("{}/3/device/{}", self.endpoint, token);
        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .header("apns-topic", &envelope.topic)
            .header("apns-push-type", envelope.push_type)
            .header("apns-priority", envelope.priority.to_string())
            .header("apns-expiration", envelope.expiration.to_string())
            .json(&envelope.payload)
            .send()
            .await
            .map_err(|e| TokenFailure::new(token, FailureReason::Transport(e.to_string()), None))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let reason = match response.json::<ErrorBody>().await {
            Ok(body) => FailureReason::from_reason(&body.reason),
            Err(_) => FailureReason::Unknown(status.to_string()),
        };
        Err(TokenFailure::new(token, reason, Some(status.as_u16())))
    }
}

#[async_trait]
impl GatewayConnection for ApnsConnection {
    async fn send(&self, envelope: &Envelope, tokens: &[String]) -> Result<BatchResponse> {
        let closed = self.closed.read().await;
        if *closed {
            return Err(PushError::Closed);
        }

        let bearer = self.provider.bearer().await?;
        let results = join_all(
            tokens
                .iter()
                .map(|token| self.send_one(&bearer, envelope, token)),
        )
        .await;

        let mut response = BatchResponse::default();
        for (token, result) in tokens.iter().zip(results) {
            match result {
                Ok(()) => response.sent.push(token.clone()),
                Err(failure) => {
                    warn!(
                        token = %summarize_token(Some(token)),
                        reason = %failure.reason,
                        status = ?failure.status,
                        "Gateway rejected notification"
                    );
                    response.failed.push(failure);
                }
            }
        }

        Ok(response)
    }

    async fn close(&self) {
        let mut closed = self.closed.write().await;
        *closed = true;
    }
}
