//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了单层缓存编排器，由一个后端适配器支撑。

use super::TypedCache;
use crate::backend::Backend;
use crate::config::CacheOptions;
use crate::error::{CacheError, Result};
use crate::key::KeyNamespace;
use crate::serialization::{Serializer, SerializerEnum};
use crate::sync::FlightGroup;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{instrument, warn};

/// 单层缓存编排器
///
/// 类型化的set/get/del加两个回源辅助操作，背后只有一个适配器。
/// 适配器以 `Arc<dyn Backend>` 共享，可被多个编排器实例复用。
pub struct Cache<T> {
    backend: Arc<dyn Backend>,
    opts: CacheOptions,
    namespace: KeyNamespace,
    serializer: SerializerEnum,
    flight: FlightGroup<T>,
}

impl<T> Cache<T>
where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    /// 创建新的单层缓存编排器
    ///
    /// # 参数
    ///
    /// * `backend` - 后端适配器
    /// * `opts` - 基础配置
    /// * `serializer` - 序列化器
    pub fn new(backend: Arc<dyn Backend>, opts: CacheOptions, serializer: SerializerEnum) -> Self {
        let namespace = opts.namespace();
        Self {
            backend,
            opts,
            namespace,
            serializer,
            flight: FlightGroup::new(),
        }
    }

    /// 批量写入
    ///
    /// 所有值先完成序列化再下发一次批量写，任一序列化失败则
    /// 整个调用失败且不产生任何写入
    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    pub async fn set(&self, entries: HashMap<String, T>) -> Result<()> {
        let mut kv = HashMap::with_capacity(entries.len());
        for (key, value) in &entries {
            let bytes = self.serializer.serialize(value)?;
            kv.insert(self.namespace.build(key), bytes);
        }

        self.backend.set(kv, self.opts.ttl()).await
    }

    /// 批量读取
    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    pub async fn get(&self, keys: &[String]) -> Result<HashMap<String, T>> {
        let ns_keys = self.namespace.build_all(keys);
        let kv = self.backend.get(&ns_keys).await?;

        let mut out = HashMap::with_capacity(kv.len());
        for (key, bytes) in kv {
            let value = self.serializer.deserialize(&bytes)?;
            out.insert(self.namespace.split(&key), value);
        }

        Ok(out)
    }

    /// 批量读取，缓存miss时调用resolver从权威数据源加载
    #[instrument(skip(self, keys, resolver), level = "debug", fields(key_count = keys.len()))]
    pub async fn get_and_set<F, Fut>(
        &self,
        keys: &[String],
        resolver: F,
    ) -> Result<HashMap<String, T>>
    where
        F: FnOnce(Vec<String>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<HashMap<String, T>>> + Send + 'static,
    {
        let mut kv = self.get(keys).await?;

        let miss_keys: Vec<String> = keys
            .iter()
            .filter(|k| !kv.contains_key(*k))
            .cloned()
            .collect();
        if miss_keys.is_empty() {
            return Ok(kv);
        }

        let mut resolved = resolver(miss_keys.clone()).await?;
        for (key, value) in &resolved {
            kv.insert(key.clone(), value.clone());
        }

        // 外部数据源返回少于miss集合时，穿透保护补零值写入
        if self.opts.write_nil && resolved.len() != miss_keys.len() {
            for key in &miss_keys {
                if !resolved.contains_key(key) {
                    resolved.insert(key.clone(), T::default());
                }
            }
        }
        if !resolved.is_empty() {
            if let Err(e) = self.set(resolved).await {
                self.log_population_failure("get_and_set", &e);
            }
        }

        Ok(kv)
    }

    /// 单key读取，缓存miss时经并发去重后调用resolver加载
    #[instrument(skip(self, resolver), level = "debug")]
    pub async fn get_and_set_single<F, Fut>(&self, key: &str, resolver: F) -> Result<(T, bool)>
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(T, bool)>> + Send + 'static,
    {
        let mut kv = self.get(&[key.to_string()]).await?;
        if let Some(value) = kv.remove(key) {
            return Ok((value, true));
        }

        // 缓存miss，单飞回源
        let logical = key.to_string();
        let outcome = self.flight.run(key, move || resolver(logical)).await;
        let (value, found) = match outcome {
            Ok(pair) => pair,
            Err(shared) => return Err(CacheError::Shared(shared)),
        };

        // 写入缓存条件：1、数据存在；2、数据不存在并且write_nil为true
        if found || self.opts.write_nil {
            let mut entries = HashMap::new();
            entries.insert(key.to_string(), value.clone());
            if let Err(e) = self.set(entries).await {
                self.log_population_failure("get_and_set_single", &e);
            }
        }

        Ok((value, found))
    }

    /// 批量删除
    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    pub async fn del(&self, keys: &[String]) -> Result<()> {
        let ns_keys = self.namespace.build_all(keys);
        self.backend.del(&ns_keys).await
    }

    fn log_population_failure(&self, op: &str, err: &CacheError) {
        if self.opts.enable_log {
            warn!("cache population failed in {}: {}", op, err);
        }
    }
}

#[async_trait]
impl<T> TypedCache<T> for Cache<T>
where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    async fn set(&self, entries: HashMap<String, T>) -> Result<()> {
        Cache::set(self, entries).await
    }

    async fn get(&self, keys: &[String]) -> Result<HashMap<String, T>> {
        Cache::get(self, keys).await
    }

    async fn get_and_set<F, Fut>(
        &self,
        keys: &[String],
        resolver: F,
    ) -> Result<HashMap<String, T>>
    where
        F: FnOnce(Vec<String>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<HashMap<String, T>>> + Send + 'static,
    {
        Cache::get_and_set(self, keys, resolver).await
    }

    async fn get_and_set_single<F, Fut>(&self, key: &str, resolver: F) -> Result<(T, bool)>
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(T, bool)>> + Send + 'static,
    {
        Cache::get_and_set_single(self, key, resolver).await
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        Cache::del(self, keys).await
    }
}
