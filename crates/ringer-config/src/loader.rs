use anyhow::{anyhow, Result};
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::AppConfig;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/ringer.toml";

/// 推送网关环境变量与配置键的对应关系
const APNS_VARIABLES: [(&str, &str); 6] = [
    ("APNS_KEY_PATH", "push.key_path"),
    ("APNS_KEY_ID", "push.key_id"),
    ("APNS_TEAM_ID", "push.team_id"),
    ("APNS_BUNDLE_ID", "push.bundle_id"),
    ("APNS_VOIP_TOPIC", "push.voip_topic"),
    ("APNS_ENV", "push.env"),
];

/// 配置加载器
///
/// 优先级从低到高：默认值、TOML 文件、`RINGER__SECTION__KEY` 环境变量、`APNS_*` 环境变量。
pub struct ConfigLoader {
    path: PathBuf,
    vars: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// 创建配置加载器，文件不存在时只使用默认值与环境变量
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            vars: None,
        }
    }

    /// 使用给定的变量表代替进程环境变量
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.vars = Some(vars);
        self
    }

    /// 加载并校验配置
    pub fn load(&self) -> Result<AppConfig> {
        let vars = self
            .vars
            .clone()
            .unwrap_or_else(|| std::env::vars().collect());

        let mut builder = Config::builder();

        if self.path.exists() {
            builder = builder.add_source(File::new(
                self.path
                    .to_str()
                    .ok_or_else(|| anyhow!("Invalid config path"))?,
                FileFormat::Toml,
            ));
        }

        builder = builder.add_source(
            Environment::with_prefix("RINGER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(
                    vars.iter()
                        .filter(|(key, _)| key.starts_with("RINGER__"))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                )),
        );

        for (variable, key) in APNS_VARIABLES {
            let value = vars
                .get(variable)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(|value| match variable {
                    "APNS_ENV" => value.to_ascii_lowercase(),
                    _ => value.to_string(),
                });
            builder = builder.set_override_option(key, value)?;
        }

        let config: AppConfig = builder.build()?.try_deserialize()?;
        Self::validate(&config)?;
        Ok(config)
    }

    /// 验证配置
    pub fn validate(config: &AppConfig) -> Result<()> {
        if config.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        if config.calls.dedup_window_secs == 0 {
            return Err(anyhow!("calls.dedup_window_secs must be greater than 0"));
        }

        if config.push.max_concurrent_chunks == 0 {
            return Err(anyhow!("push.max_concurrent_chunks must be greater than 0"));
        }

        if config.push.request_timeout_secs == 0 {
            return Err(anyhow!("push.request_timeout_secs must be greater than 0"));
        }

        let has_secret = config
            .auth
            .jwt_secret
            .as_deref()
            .is_some_and(|secret| !secret.is_empty());
        if config.auth.required && !has_secret {
            return Err(anyhow!("auth.jwt_secret is required when auth.required is true"));
        }

        Ok(())
    }
}
