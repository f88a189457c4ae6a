use crate::channel::{PushTarget, WakeChannel};
use crate::config::PushConfig;
use crate::envelope::{Envelope, PushPayload};
use crate::gateway::BatchResponse;
use crate::pool::GatewayPool;
use crate::{PushError, Result};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use ringer_device::{summarize_token, PushEnvironment};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 单次网关调用的令牌数上限
pub const MAX_BATCH_SIZE: usize = 100;

/// 一次推送任务，只属于一次 `dispatch` 调用
#[derive(Debug, Clone)]
pub struct PushJob {
    pub targets: Vec<PushTarget>,
    pub channel: WakeChannel,
    pub payload: PushPayload,
}

impl PushJob {
    pub fn new(targets: Vec<PushTarget>, channel: WakeChannel, payload: PushPayload) -> Self {
        Self {
            targets,
            channel,
            payload,
        }
    }
}

/// 推送汇总结果
///
/// `sent + failed` 恒等于未被环境模式过滤掉的令牌数，
/// 被过滤的令牌只计入 `dropped`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushOutcome {
    pub sent: usize,
    pub failed: usize,
    pub dropped: usize,
    pub invalid_tokens: Vec<String>,
    pub chunks: usize,
}

impl PushOutcome {
    pub fn merge(&mut self, other: PushOutcome) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.dropped += other.dropped;
        self.invalid_tokens.extend(other.invalid_tokens);
        self.chunks += other.chunks;
    }

    fn absorb(&mut self, response: BatchResponse) {
        self.sent += response.sent.len();
        for failure in response.failed {
            self.failed += 1;
            if failure.reason.is_permanent() {
                self.invalid_tokens.push(failure.token);
            }
        }
    }
}

/// 推送分发器
pub struct PushDispatcher {
    config: PushConfig,
    pool: Arc<GatewayPool>,
}

impl PushDispatcher {
    pub fn new(config: PushConfig, pool: Arc<GatewayPool>) -> Self {
        Self { config, pool }
    }

    pub fn pool(&self) -> &Arc<GatewayPool> {
        &self.pool
    }

    pub fn default_environment(&self) -> PushEnvironment {
        self.pool.default_environment()
    }

    /// 分块发送并汇总每个令牌的结果
    ///
    /// 凭据缺失或连接池已关闭时直接返回错误；
    /// 网关侧的任何失败都计入结果，不会作为错误抛出。
    pub async fn dispatch(&self, job: PushJob) -> Result<PushOutcome> {
        let credentials = self.config.credentials()?;
        if self.pool.is_closed() {
            return Err(PushError::Closed);
        }

        if job.targets.is_empty() {
            return Ok(PushOutcome::default());
        }

        let envelope = Envelope::build(
            credentials.topic(job.channel),
            job.channel,
            &job.payload,
            Utc::now(),
        );

        let chunks: Vec<Vec<PushTarget>> = job
            .targets
            .chunks(MAX_BATCH_SIZE)
            .map(<[_]>::to_vec)
            .collect();
        let envelope = &envelope;

        let results: Vec<Result<PushOutcome>> = stream::iter(chunks)
            .map(|chunk| async move { self.send_chunk(envelope, &chunk).await })
            .buffer_unordered(self.config.max_concurrent_chunks.max(1))
            .collect()
            .await;

        let mut outcome = PushOutcome::default();
        for result in results {
            outcome.merge(result?);
        }

        info!(
            channel = %job.channel,
            sent = outcome.sent,
            failed = outcome.failed,
            dropped = outcome.dropped,
            invalid = outcome.invalid_tokens.len(),
            chunks = outcome.chunks,
            "Push dispatch completed"
        );

        Ok(outcome)
    }

    async fn send_chunk(&self, envelope: &Envelope, chunk: &[PushTarget]) -> Result<PushOutcome> {
        let mut outcome = PushOutcome {
            chunks: 1,
            ..PushOutcome::default()
        };

        let mut production = Vec::new();
        let mut sandbox = Vec::new();
        for target in chunk {
            match self.pool.resolve(target.env) {
                Some(PushEnvironment::Production) => production.push(target.token.clone()),
                Some(PushEnvironment::Sandbox) => sandbox.push(target.token.clone()),
                None => outcome.dropped += 1,
            }
        }

        if outcome.dropped > 0 {
            debug!(
                dropped = outcome.dropped,
                mode = ?self.pool.mode(),
                "Tokens filtered by environment mode"
            );
        }

        for (env, tokens) in [
            (PushEnvironment::Production, production),
            (PushEnvironment::Sandbox, sandbox),
        ] {
            if tokens.is_empty() {
                continue;
            }

            match self.send_batch(env, envelope, &tokens).await {
                Ok(response) => outcome.absorb(response),
                Err(e) if e.is_configuration() || matches!(e, PushError::Closed) => return Err(e),
                Err(e) => {
                    warn!(
                        env = %env,
                        tokens = tokens.len(),
                        first = %summarize_token(tokens.first().map(String::as_str)),
                        error = %e,
                        "Gateway sub-batch failed"
                    );
                    outcome.failed += tokens.len();
                }
            }
        }

        Ok(outcome)
    }

    async fn send_batch(
        &self,
        env: PushEnvironment,
        envelope: &Envelope,
        tokens: &[String],
    ) -> Result<BatchResponse> {
        let timeout = self.config.request_timeout();
        let send = async {
            let connection = self.pool.connection(env).await?;
            connection.send(envelope, tokens).await
        };

        // 建连（含读取密钥）与发送共用同一个超时
        match tokio::time::timeout(timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(PushError::Timeout(timeout)),
        }
    }
}
