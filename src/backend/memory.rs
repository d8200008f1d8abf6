//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了进程内存储适配器，基于内存的高速缓存。

use super::Backend;
use crate::error::Result;
use async_trait::async_trait;
use moka::future::Cache;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// 进程内存储适配器
///
/// 使用Moka作为底层缓存库，过期时间随值一起存储并在读取时惰性检查
#[derive(Clone)]
pub struct MemoryBackend {
    // 值: (数据, 过期时间)
    cache: Cache<String, (Vec<u8>, Option<Instant>)>,
}

impl MemoryBackend {
    /// 创建新的进程内存储适配器
    ///
    /// # 参数
    ///
    /// * `capacity` - 缓存最大容量（条目数）
    pub fn new(capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
        }
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    async fn set(&self, entries: HashMap<String, Vec<u8>>, ttl: Duration) -> Result<()> {
        let expire_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        for (key, value) in entries {
            debug!("memory set: key={}, value_len={}", key, value.len());
            self.cache.insert(key, (value, expire_at)).await;
        }
        Ok(())
    }

    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        let mut out = HashMap::new();
        for key in keys {
            match self.cache.get(key).await {
                Some((bytes, expire_at)) => {
                    if let Some(expire_time) = expire_at {
                        if Instant::now() >= expire_time {
                            self.cache.remove(key).await;
                            debug!("memory get: key={}, expired=true, removed", key);
                            continue;
                        }
                    }
                    out.insert(key.clone(), bytes);
                }
                None => {
                    debug!("memory get: key={}, found=false", key);
                }
            }
        }
        Ok(out)
    }

    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    async fn del(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            self.cache.remove(key).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del() {
        let backend = MemoryBackend::new(100);
        let mut entries = HashMap::new();
        entries.insert("k1".to_string(), b"v1".to_vec());
        backend
            .set(entries, Duration::from_secs(60))
            .await
            .unwrap();

        let got = backend.get(&["k1".to_string(), "k2".to_string()]).await.unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got["k1"], b"v1");

        backend.del(&["k1".to_string()]).await.unwrap();
        let got = backend.get(&["k1".to_string()]).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn expired_entry_is_removed_on_read() {
        let backend = MemoryBackend::new(100);
        let mut entries = HashMap::new();
        entries.insert("k1".to_string(), b"v1".to_vec());
        backend
            .set(entries, Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let got = backend.get(&["k1".to_string()]).await.unwrap();
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn empty_key_set_is_a_noop() {
        let backend = MemoryBackend::new(100);
        backend.set(HashMap::new(), Duration::from_secs(1)).await.unwrap();
        assert!(backend.get(&[]).await.unwrap().is_empty());
        backend.del(&[]).await.unwrap();
    }
}
