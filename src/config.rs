//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了缓存系统的配置结构和解析逻辑。

use crate::error::{CacheError, Result};
use crate::key::{KeyNamespace, SEPARATOR};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 缓存编排器配置
///
/// 构造后不可变，同一实例的所有操作共享同一份配置
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct CacheOptions {
    /// 缓存前缀，非空时拼接在每个key上
    pub prefix: String,
    /// 过期时间（秒），应用于每次Set和回写
    pub expire: u64,
    /// 缓存miss是否写入零值防止缓存穿透，默认不写入
    pub write_nil: bool,
    /// 是否将内部非致命失败输出到日志
    pub enable_log: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            expire: 300,
            write_nil: false,
            enable_log: true,
        }
    }
}

impl CacheOptions {
    /// 校验配置
    ///
    /// 前缀不得包含分隔符，否则剥离前缀时无法还原逻辑key
    pub fn validate(&self) -> Result<()> {
        if self.prefix.contains(SEPARATOR) {
            return Err(CacheError::ConfigError(format!(
                "prefix {:?} must not contain separator {:?}",
                self.prefix, SEPARATOR
            )));
        }
        if self.expire == 0 {
            return Err(CacheError::ConfigError(
                "expire must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// 从TOML文件加载配置
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let opts: CacheOptions =
            toml::from_str(&raw).map_err(|e| CacheError::ConfigError(e.to_string()))?;
        opts.validate()?;
        Ok(opts)
    }

    /// 根据前缀构造key命名空间
    pub fn namespace(&self) -> KeyNamespace {
        KeyNamespace::new(self.prefix.clone())
    }

    /// 过期时间
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.expire)
    }
}

/// Redis后端配置
///
/// 定义网络存储适配器的连接参数
#[derive(Deserialize, Clone, Debug)]
pub struct RedisConfig {
    /// 连接串，如 redis://127.0.0.1:6379
    pub connection_string: SecretString,
    /// 建立连接的超时时间（毫秒）
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    /// 单条命令的超时时间（毫秒）
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
    /// 重连监控的探活间隔（秒）
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
}

fn default_connection_timeout_ms() -> u64 {
    5000
}

fn default_command_timeout_ms() -> u64 {
    5000
}

fn default_ping_interval_secs() -> u64 {
    30
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            connection_string: SecretString::new("redis://127.0.0.1:6379".into()),
            connection_timeout_ms: default_connection_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
            ping_interval_secs: default_ping_interval_secs(),
        }
    }
}
