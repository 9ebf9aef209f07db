//! 配置系统
//! 从环境变量加载所有配置（前缀 BANK_，层级分隔符 __）

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

/// 默认 API 地址
pub const DEFAULT_BASE_URL: &str = "http://localhost:3001/api/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// 银行 API 根地址，例如 "https://bank.example.com/api/v1"
    pub base_url: String,
    /// 单个请求超时时间（秒）
    pub request_timeout_secs: u64,
    /// 刷新令牌请求超时时间（秒）
    pub refresh_timeout_secs: u64,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout_secs: 30,
            refresh_timeout_secs: 15,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// 凭据文件路径
    pub credentials_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别: trace, debug, info, warn, error
    pub level: String,
    /// 日志格式: json, pretty, compact
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

fn default_credentials_path() -> String {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => format!("{home}/.bankctl/credentials.json"),
        _ => ".bankctl/credentials.json".to_string(),
    }
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        settings = settings
            .set_default("api.base_url", DEFAULT_BASE_URL)?
            .set_default("api.request_timeout_secs", 30)?
            .set_default("api.refresh_timeout_secs", 15)?
            .set_default("storage.credentials_path", default_credentials_path())?
            .set_default("logging.level", "warn")?
            .set_default("logging.format", "compact")?;

        settings = settings.add_source(
            Environment::with_prefix("BANK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::Message(format!("Invalid api.base_url {}: {}", self.api.base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Message(format!(
                "api.base_url must use http or https, got {}",
                url.scheme()
            )));
        }

        if !(1..=300).contains(&self.api.request_timeout_secs) {
            return Err(ConfigError::Message(
                "request_timeout_secs must be between 1 and 300".to_string(),
            ));
        }

        if !(1..=300).contains(&self.api.refresh_timeout_secs) {
            return Err(ConfigError::Message(
                "refresh_timeout_secs must be between 1 and 300".to_string(),
            ));
        }

        if self.storage.credentials_path.trim().is_empty() {
            return Err(ConfigError::Message(
                "storage.credentials_path must not be empty".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty, compact",
                    self.logging.format
                )))
            }
        }

        Ok(())
    }
}
