//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了测试的通用工具函数和辅助后端。

#![allow(dead_code)]

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tiercache::backend::{Backend, MemoryBackend};
use tiercache::config::RedisConfig;
use tiercache::error::{CacheError, Result};
use tiercache::RedisBackend;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

pub fn setup_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init()
            .ok();
    });
}

/// 测试用值类型
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Person {
    pub name: String,
    pub age: u32,
}

impl Person {
    pub fn ana() -> Self {
        Self {
            name: "Ana".to_string(),
            age: 20,
        }
    }
}

/// 生成不易冲突的测试key
pub fn unique_key(label: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}-{}", label, suffix)
}

/// 记录各操作调用次数的后端，委托给内存后端
pub struct RecordingBackend {
    inner: MemoryBackend,
    pub set_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub del_calls: AtomicUsize,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::new(1000),
            set_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            del_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_count(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for RecordingBackend {
    async fn set(&self, entries: HashMap<String, Vec<u8>>, ttl: Duration) -> Result<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.set(entries, ttl).await
    }

    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get(keys).await
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        self.del_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.del(keys).await
    }
}

/// 所有操作都失败的后端
pub struct FailingBackend;

#[async_trait]
impl Backend for FailingBackend {
    async fn set(&self, _entries: HashMap<String, Vec<u8>>, _ttl: Duration) -> Result<()> {
        Err(CacheError::BackendError("set rejected".to_string()))
    }

    async fn get(&self, _keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        Err(CacheError::BackendError("get rejected".to_string()))
    }

    async fn del(&self, _keys: &[String]) -> Result<()> {
        Err(CacheError::BackendError("del rejected".to_string()))
    }
}

/// 写入失败、读取和删除正常的后端
pub struct WriteFailingBackend {
    inner: MemoryBackend,
}

impl WriteFailingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: MemoryBackend::new(1000),
        })
    }
}

#[async_trait]
impl Backend for WriteFailingBackend {
    async fn set(&self, _entries: HashMap<String, Vec<u8>>, _ttl: Duration) -> Result<()> {
        Err(CacheError::BackendError("set rejected".to_string()))
    }

    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>> {
        self.inner.get(keys).await
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        self.inner.del(keys).await
    }
}

/// 检查本地Redis是否可用
pub async fn is_redis_available() -> bool {
    let config = RedisConfig {
        connection_timeout_ms: 1000,
        command_timeout_ms: 1000,
        ..Default::default()
    };
    match RedisBackend::new(&config).await {
        Ok(backend) => {
            let alive = backend.ping().await.is_ok();
            let _ = backend.shutdown().await;
            alive
        }
        Err(_) => false,
    }
}
