//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了网络存储适配器，基于Redis的分布式缓存。

use super::Backend;
use crate::config::RedisConfig;
use crate::error::{CacheError, Result};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// 删除操作的重试次数
const DEL_RETRY_ATTEMPTS: usize = 3;
/// 删除操作重试之间的等待时间
const DEL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// 网络存储适配器
///
/// 批量写入通过pipeline下发SET命令，批量读取使用MGET。
/// 连接句柄由后台探活任务守护，探活失败时重建并原地替换。
pub struct RedisBackend {
    manager: Arc<RwLock<ConnectionManager>>,
    command_timeout: Duration,
    monitor_handle: Option<JoinHandle<()>>,
}

impl RedisBackend {
    /// 创建新的网络存储适配器
    ///
    /// # 参数
    ///
    /// * `config` - Redis连接配置
    ///
    /// # 返回值
    ///
    /// 返回新的RedisBackend实例或错误
    #[instrument(skip(config), level = "info", name = "init_redis_backend")]
    pub async fn new(config: &RedisConfig) -> Result<Self> {
        let client = Client::open(config.connection_string.expose_secret())?;

        let connect_timeout = Duration::from_millis(config.connection_timeout_ms);
        let manager = match tokio::time::timeout(connect_timeout, client.get_connection_manager())
            .await
        {
            Ok(manager) => manager?,
            Err(_) => {
                return Err(CacheError::Timeout(format!(
                    "redis connect timed out after {}ms",
                    config.connection_timeout_ms
                )))
            }
        };
        let manager = Arc::new(RwLock::new(manager));

        let backend = Self {
            manager: manager.clone(),
            command_timeout: Duration::from_millis(config.command_timeout_ms),
            monitor_handle: None,
        };
        backend.ping().await?;

        let monitor_handle = Self::spawn_monitor(
            client,
            manager,
            Duration::from_secs(config.ping_interval_secs),
        );

        Ok(Self {
            monitor_handle: Some(monitor_handle),
            ..backend
        })
    }

    /// 启动重连监控
    ///
    /// 周期性探活，检查连接是否断开，如果断开则重建连接并替换句柄
    fn spawn_monitor(
        client: Client,
        manager: Arc<RwLock<ConnectionManager>>,
        interval: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;

                let mut conn = { manager.read().await.clone() };
                let pong: redis::RedisResult<String> =
                    redis::cmd("PING").query_async(&mut conn).await;
                if pong.is_ok() {
                    continue;
                }

                warn!("redis connection lost, reconnecting");
                match client.get_connection_manager().await {
                    Ok(new_manager) => {
                        *manager.write().await = new_manager;
                        info!("redis reconnected");
                    }
                    Err(e) => {
                        warn!("redis reconnect failed: {}", e);
                    }
                }
            }
        })
    }

    /// 探活
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection().await;
        self.with_timeout("ping", async move {
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    /// 关闭适配器，停止后台探活任务
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(handle) = &self.monitor_handle {
            handle.abort();
        }
        Ok(())
    }

    async fn connection(&self) -> ConnectionManager {
        self.manager.read().await.clone()
    }

    async fn with_timeout<R>(
        &self,
        op: &str,
        fut: impl Future<Output = redis::RedisResult<R>>,
    ) -> Result<R> {
        match tokio::time::timeout(self.command_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(CacheError::Timeout(format!(
                "redis {} timed out after {:?}",
                op, self.command_timeout
            ))),
        }
    }
}

#[async_trait]
impl Backend for RedisBackend {
    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    async fn set(&self, entries: HashMap<String, Vec<u8>>, ttl: Duration) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let secs = ttl.as_secs();
        let mut pipe = redis::pipe();
        for (key, value) in entries {
            if secs > 0 {
                pipe.cmd("SET").arg(key).arg(value).arg("EX").arg(secs).ignore();
            } else {
                pipe.cmd("SET").arg(key).arg(value).ignore();
            }
        }

        let mut conn = self.connection().await;
        self.with_timeout("set", async move {
            let _: () = pipe.query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let mut conn = self.connection().await;
        let queried = keys.to_vec();
        let values: Vec<Option<Vec<u8>>> = self
            .with_timeout("get", async move {
                redis::cmd("MGET").arg(&queried).query_async(&mut conn).await
            })
            .await?;

        let mut out = HashMap::new();
        for (key, value) in keys.iter().zip(values) {
            match value {
                Some(bytes) => {
                    out.insert(key.clone(), bytes);
                }
                None => {
                    debug!("redis get: key={}, found=false", key);
                }
            }
        }
        Ok(out)
    }

    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    async fn del(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut last_err = None;
        for attempt in 1..=DEL_RETRY_ATTEMPTS {
            let mut conn = self.connection().await;
            let deleted = keys.to_vec();
            let result = self
                .with_timeout("del", async move {
                    let _: () = redis::cmd("DEL").arg(&deleted).query_async(&mut conn).await?;
                    Ok(())
                })
                .await;
            match result {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(
                        "redis del attempt {}/{} failed: {}",
                        attempt, DEL_RETRY_ATTEMPTS, e
                    );
                    last_err = Some(e);
                    if attempt < DEL_RETRY_ATTEMPTS {
                        tokio::time::sleep(DEL_RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| CacheError::BackendError("redis del failed".to_string())))
    }
}
