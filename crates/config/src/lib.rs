//! 统一配置中心
//!
//! 提供中继服务的全局配置管理，包括：
//! - 监听地址
//! - WebSocket 挂载路径
//! - 心跳检测间隔
//! - 静态页面目录

use std::time::Duration;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务配置
    pub server: ServerConfig,
    /// 中继核心配置
    pub hub: HubConfig,
}

/// 服务器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 中继核心配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    /// WebSocket 升级路径
    pub ws_path: String,
    /// 心跳探测间隔（秒）
    pub heartbeat_interval_secs: u64,
    /// admin.html / user.html 所在目录
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            hub: HubConfig::default(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            ws_path: "/live-chat".to_string(),
            heartbeat_interval_secs: 30,
            static_dir: "public".to_string(),
        }
    }
}

impl HubConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }
}

impl ServerConfig {
    /// `host:port`，直接交给 `TcpListener::bind`
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AppConfig {
    /// 加载顺序：默认值 -> 可选配置文件 (APP_CONFIG_FILE) -> PORT -> 环境变量 (APP_*)
    pub fn load() -> Result<Self, ConfigError> {
        let config: AppConfig = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    fn figment() -> Figment {
        let mut fig = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Ok(path) = std::env::var("APP_CONFIG_FILE") {
            if path.ends_with(".yml") || path.ends_with(".yaml") {
                fig = fig.merge(Yaml::file(path));
            } else if path.ends_with(".json") {
                fig = fig.merge(Json::file(path));
            } else {
                fig = fig.merge(Toml::file(path));
            }
        }

        // 兼容托管平台注入的 PORT
        fig.merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
            .merge(Env::prefixed("APP_").split("__"))
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidServerConfig(
                "host cannot be empty".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidServerPort(
                "port must be greater than 0".to_string(),
            ));
        }

        if !self.hub.ws_path.starts_with('/') {
            return Err(ConfigError::InvalidHubConfig(format!(
                "ws_path must start with '/': {}",
                self.hub.ws_path
            )));
        }

        if self.hub.heartbeat_interval_secs == 0 {
            return Err(ConfigError::InvalidHubConfig(
                "heartbeat interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server port: {0}")]
    InvalidServerPort(String),
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid hub configuration: {0}")]
    InvalidHubConfig(String),
    #[error("Failed to load configuration: {0}")]
    Load(#[from] figment::Error),
}
