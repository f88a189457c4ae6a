use async_trait::async_trait;
use ringer_device::PushEnvironment;
use ringer_push::{
    BatchResponse, EnvMode, Envelope, FailureReason, GatewayConnection, GatewayConnector,
    GatewayPool, PushConfig, PushDispatcher, PushError, PushJob, PushPayload, PushTarget,
    Result, TokenFailure, WakeChannel,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// 记录每次发送，并按脚本返回逐令牌结果
#[derive(Default)]
struct Script {
    reasons: HashMap<String, &'static str>,
    delay: Option<Duration>,
    connect_delay: Option<Duration>,
    sends: Mutex<Vec<(PushEnvironment, Envelope, Vec<String>)>>,
}

impl Script {
    fn sends(&self) -> Vec<(PushEnvironment, Envelope, Vec<String>)> {
        self.sends.lock().unwrap().clone()
    }

    fn tokens_sent_to(&self, env: PushEnvironment) -> usize {
        self.sends()
            .iter()
            .filter(|(e, _, _)| *e == env)
            .map(|(_, _, tokens)| tokens.len())
            .sum()
    }
}

struct ScriptedConnection {
    env: PushEnvironment,
    script: Arc<Script>,
}

#[async_trait]
impl GatewayConnection for ScriptedConnection {
    async fn send(&self, envelope: &Envelope, tokens: &[String]) -> Result<BatchResponse> {
        if let Some(delay) = self.script.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .sends
            .lock()
            .unwrap()
            .push((self.env, envelope.clone(), tokens.to_vec()));

        let mut response = BatchResponse::default();
        for token in tokens {
            match self.script.reasons.get(token) {
                Some(reason) => response.failed.push(TokenFailure::new(
                    token.clone(),
                    FailureReason::from_reason(reason),
                    Some(410),
                )),
                None => response.sent.push(token.clone()),
            }
        }
        Ok(response)
    }

    async fn close(&self) {}
}

struct ScriptedConnector {
    script: Arc<Script>,
}

#[async_trait]
impl GatewayConnector for ScriptedConnector {
    async fn connect(&self, env: PushEnvironment) -> Result<Arc<dyn GatewayConnection>> {
        if let Some(delay) = self.script.connect_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(Arc::new(ScriptedConnection {
            env,
            script: self.script.clone(),
        }))
    }
}

fn configured(mode: EnvMode) -> PushConfig {
    PushConfig {
        key_path: Some(PathBuf::from("/keys/AuthKey.p8")),
        key_id: Some("KEY123".to_string()),
        team_id: Some("TEAM42".to_string()),
        bundle_id: Some("com.example.ringer".to_string()),
        env: mode,
        ..PushConfig::default()
    }
}

fn dispatcher(config: PushConfig, script: Script) -> (PushDispatcher, Arc<Script>) {
    let script = Arc::new(script);
    let connector = Arc::new(ScriptedConnector {
        script: script.clone(),
    });
    let pool = Arc::new(GatewayPool::new(config.env, connector));
    (PushDispatcher::new(config, pool), script)
}

fn targets(count: usize, env: Option<PushEnvironment>) -> Vec<PushTarget> {
    (0..count)
        .map(|i| PushTarget::new(format!("token-{i:04}"), env))
        .collect()
}

fn alert_job(targets: Vec<PushTarget>) -> PushJob {
    PushJob::new(
        targets,
        WakeChannel::Background,
        PushPayload::alert("Hello", "World"),
    )
}

#[tokio::test]
async fn test_chunking_boundaries() {
    for (count, expected_chunks) in [(100, 1), (101, 2), (250, 3)] {
        let (dispatcher, script) = dispatcher(configured(EnvMode::Production), Script::default());
        let outcome = dispatcher
            .dispatch(alert_job(targets(count, Some(PushEnvironment::Production))))
            .await
            .unwrap();

        assert_eq!(outcome.chunks, expected_chunks, "count={count}");
        assert_eq!(outcome.sent + outcome.failed, count);

        let sends = script.sends();
        assert_eq!(sends.len(), expected_chunks);
        assert!(sends.iter().all(|(_, _, tokens)| tokens.len() <= 100));
    }
}

#[tokio::test]
async fn test_production_mode_drops_sandbox_tokens() {
    let (dispatcher, script) = dispatcher(configured(EnvMode::Production), Script::default());

    let mut mixed = targets(3, Some(PushEnvironment::Production));
    mixed.push(PushTarget::new("sandbox-1", Some(PushEnvironment::Sandbox)));
    mixed.push(PushTarget::new("sandbox-2", Some(PushEnvironment::Sandbox)));
    mixed.push(PushTarget::new("untagged", None));

    let outcome = dispatcher.dispatch(alert_job(mixed)).await.unwrap();

    assert_eq!(outcome.sent, 4);
    assert_eq!(outcome.failed, 0);
    assert_eq!(outcome.dropped, 2);
    assert_eq!(script.tokens_sent_to(PushEnvironment::Sandbox), 0);
    assert_eq!(script.tokens_sent_to(PushEnvironment::Production), 4);
}

#[tokio::test]
async fn test_both_mode_splits_chunk_by_environment() {
    let (dispatcher, script) = dispatcher(configured(EnvMode::Both), Script::default());

    let mut mixed = targets(2, Some(PushEnvironment::Sandbox));
    mixed.push(PushTarget::new("prod-1", Some(PushEnvironment::Production)));

    let outcome = dispatcher.dispatch(alert_job(mixed)).await.unwrap();

    assert_eq!(outcome.sent, 3);
    assert_eq!(outcome.dropped, 0);
    assert_eq!(outcome.chunks, 1);

    let sends = script.sends();
    assert_eq!(sends.len(), 2);
    // 同一分块内先生产环境后 sandbox
    assert_eq!(sends[0].0, PushEnvironment::Production);
    assert_eq!(sends[1].0, PushEnvironment::Sandbox);
}

#[tokio::test]
async fn test_failure_classification() {
    let mut script = Script::default();
    script.reasons.insert("token-0000".to_string(), "Unregistered");
    script.reasons.insert("token-0001".to_string(), "BadDeviceToken");
    script.reasons.insert("token-0002".to_string(), "TooManyRequests");
    script.reasons.insert("token-0003".to_string(), "SomethingNew");

    let (dispatcher, _script) = dispatcher(configured(EnvMode::Production), script);
    let outcome = dispatcher
        .dispatch(alert_job(targets(6, Some(PushEnvironment::Production))))
        .await
        .unwrap();

    assert_eq!(outcome.sent, 2);
    assert_eq!(outcome.failed, 4);
    let mut invalid = outcome.invalid_tokens.clone();
    invalid.sort();
    assert_eq!(invalid, vec!["token-0000".to_string(), "token-0001".to_string()]);
}

#[tokio::test]
async fn test_envelope_topic_per_channel() {
    let (dispatcher, script) = dispatcher(configured(EnvMode::Production), Script::default());

    let job = PushJob::new(
        targets(1, None),
        WakeChannel::Interactive,
        PushPayload::new().with_category("INCOMING_CALL"),
    );
    dispatcher.dispatch(job).await.unwrap();
    dispatcher.dispatch(alert_job(targets(1, None))).await.unwrap();

    let sends = script.sends();
    assert_eq!(sends[0].1.topic, "com.example.ringer.voip");
    assert_eq!(sends[0].1.push_type, "voip");
    assert_eq!(sends[1].1.topic, "com.example.ringer");
    assert_eq!(sends[1].1.push_type, "alert");
}

#[tokio::test]
async fn test_missing_credentials_fail_fast() {
    let config = PushConfig {
        key_id: None,
        ..configured(EnvMode::Production)
    };
    let (dispatcher, script) = dispatcher(config, Script::default());

    let err = dispatcher
        .dispatch(alert_job(targets(3, None)))
        .await
        .unwrap_err();

    assert!(matches!(err, PushError::NotConfigured(ref missing) if missing.contains("APNS_KEY_ID")));
    assert!(script.sends().is_empty());
}

#[tokio::test]
async fn test_empty_job() {
    let (dispatcher, script) = dispatcher(configured(EnvMode::Production), Script::default());
    let outcome = dispatcher.dispatch(alert_job(Vec::new())).await.unwrap();
    assert_eq!(outcome, Default::default());
    assert!(script.sends().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_gateway_counts_as_failed() {
    let script = Script {
        delay: Some(Duration::from_secs(30)),
        ..Script::default()
    };
    let config = PushConfig {
        request_timeout_secs: 2,
        ..configured(EnvMode::Production)
    };
    let (dispatcher, _script) = dispatcher(config, script);

    let outcome = dispatcher
        .dispatch(alert_job(targets(5, None)))
        .await
        .unwrap();

    assert_eq!(outcome.sent, 0);
    assert_eq!(outcome.failed, 5);
    assert!(outcome.invalid_tokens.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_slow_connect_counts_as_failed() {
    let script = Script {
        connect_delay: Some(Duration::from_secs(30)),
        ..Script::default()
    };
    let config = PushConfig {
        request_timeout_secs: 2,
        ..configured(EnvMode::Production)
    };
    let (dispatcher, script) = dispatcher(config, script);

    let outcome = dispatcher
        .dispatch(alert_job(targets(3, None)))
        .await
        .unwrap();

    assert_eq!(outcome.sent, 0);
    assert_eq!(outcome.failed, 3);
    assert!(script.sends().is_empty());
}

#[tokio::test]
async fn test_dispatch_runs_on_spawned_task() {
    let (dispatcher, script) = dispatcher(configured(EnvMode::Production), Script::default());
    let dispatcher = Arc::new(dispatcher);

    let handle = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            dispatcher
                .dispatch(alert_job(targets(150, Some(PushEnvironment::Production))))
                .await
        })
    };
    let outcome = handle.await.unwrap().unwrap();

    assert_eq!(outcome.sent, 150);
    assert_eq!(outcome.chunks, 2);
    assert_eq!(script.sends().len(), 2);
}

#[tokio::test]
async fn test_closed_pool_rejects_dispatch() {
    let (dispatcher, script) = dispatcher(configured(EnvMode::Production), Script::default());
    dispatcher.pool().close().await;

    let err = dispatcher
        .dispatch(alert_job(targets(1, None)))
        .await
        .unwrap_err();
    assert!(matches!(err, PushError::Closed));
    assert!(script.sends().is_empty());
}
