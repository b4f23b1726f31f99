//! 配置加载
//!
//! 优先级（低 → 高）：内置默认值 → `APP_CONFIG` 指向的 TOML 文件 → 环境变量。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// 服务配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 数据库（经由 ProxySQL）配置
    pub database: DatabaseConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// 绑定地址
    pub host: String,
    /// HTTP 服务端口
    pub port: u16,
}

/// 存储后端
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Mysql,
    Memory,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    /// ProxySQL 地址
    pub host: String,
    /// ProxySQL 端口，默认 6033
    pub port: u16,
    pub user: String,
    pub password: String,
    /// 数据库名
    pub name: String,
    pub max_connections: u32,
    /// 获取连接的超时时间（秒）
    pub acquire_timeout_secs: u64,
    /// 启动时创建 users 表
    pub init_schema: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Mysql,
            host: "localhost".to_string(),
            port: 6033,
            user: "root".to_string(),
            password: "mypass".to_string(),
            name: "testdb".to_string(),
            max_connections: 10,
            acquire_timeout_secs: 8,
            init_schema: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mysql" => Ok(Backend::Mysql),
            "memory" => Ok(Backend::Memory),
            other => Err(ConfigError::Invalid(format!("未知的存储后端: {}", other))),
        }
    }
}

impl DatabaseConfig {
    /// `host:port`，用于健康检查与日志
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Config {
    /// 加载配置：`.env` → 可选 TOML 文件 → 环境变量覆盖 → 校验
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut config = match std::env::var("APP_CONFIG") {
            Ok(path) => Self::load_from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 从配置文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::FileRead(e.to_string()))?;

        let config: Config =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        Ok(config)
    }

    /// 用环境变量覆盖配置项；`lookup` 便于测试时注入
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HOST") {
            self.server.host = v;
        }
        if let Some(v) = lookup("PORT") {
            self.server.port = parse_var("PORT", &v)?;
        }
        if let Some(v) = lookup("DB_BACKEND") {
            self.database.backend = v.parse()?;
        }
        if let Some(v) = lookup("DB_HOST") {
            self.database.host = v;
        }
        if let Some(v) = lookup("DB_PORT") {
            self.database.port = parse_var("DB_PORT", &v)?;
        }
        if let Some(v) = lookup("DB_USER") {
            self.database.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            self.database.password = v;
        }
        if let Some(v) = lookup("DB_NAME") {
            self.database.name = v;
        }
        if let Some(v) = lookup("DB_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DB_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs = parse_var("DB_ACQUIRE_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("DB_INIT_SCHEMA") {
            self.database.init_schema = parse_var("DB_INIT_SCHEMA", &v)?;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            self.logging.level = v;
        }
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("HTTP 端口不能为 0".to_string()));
        }
        if self.database.backend == Backend::Mysql {
            if self.database.host.trim().is_empty() {
                return Err(ConfigError::Invalid("数据库地址不能为空".to_string()));
            }
            if self.database.port == 0 {
                return Err(ConfigError::Invalid("数据库端口不能为 0".to_string()));
            }
            if self.database.user.trim().is_empty() {
                return Err(ConfigError::Invalid("数据库用户不能为空".to_string()));
            }
            if self.database.name.trim().is_empty() {
                return Err(ConfigError::Invalid("数据库名不能为空".to_string()));
            }
            if self.database.max_connections == 0 {
                return Err(ConfigError::Invalid("最大连接数必须大于 0".to_string()));
            }
        }
        if self.logging.level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "无效的日志级别: {}",
                self.logging.level
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::EnvVar {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// 配置错误类型
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败: {0}")]
    FileRead(String),
    #[error("解析配置文件失败: {0}")]
    Parse(String),
    #[error("环境变量 {key} 的值无效: {value}")]
    EnvVar { key: String, value: String },
    #[error("配置无效: {0}")]
    Invalid(String),
}
