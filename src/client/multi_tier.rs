//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了多层缓存编排器，由按优先级排列的适配器链支撑。

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

/// 多层缓存编排器
///
/// 适配器链在构造时固定，下标0为离调用方最近的一层，依次排列。
/// 读取按链路级联：上一层miss的key投递到下一层查找；某一层命中后
/// 将命中数据回写紧邻的上一层，逐步预热更快的层。
pub struct MultiCache<T> {
    backends: Vec<Arc<dyn Backend>>,
    opts: CacheOptions,
    namespace: KeyNamespace,
    serializer: SerializerEnum,
    flight: FlightGroup<T>,
}

impl<T> MultiCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    /// 创建新的多层缓存编排器
    ///
    /// # 参数
    ///
    /// * `backends` - 适配器链，离调用方最近的层放在下标0
    /// * `opts` - 基础配置
    /// * `serializer` - 序列化器
    pub fn new(
        backends: Vec<Arc<dyn Backend>>,
        opts: CacheOptions,
        serializer: SerializerEnum,
    ) -> Self {
        let namespace = opts.namespace();
        Self {
            backends,
            opts,
            namespace,
            serializer,
            flight: FlightGroup::new(),
        }
    }

    /// 批量写入
    ///
    /// 按层级顺序写入每一层，在第一个失败的层停止并返回其错误。
    /// 失败层之前的层已经写入，调用方需将状态视为层间不一致并可重试。
    #[instrument(skip(self, entries), level = "debug", fields(entry_count = entries.len()))]
    pub async fn set(&self, entries: HashMap<String, T>) -> Result<()> {
        let mut kv = HashMap::with_capacity(entries.len());
        for (key, value) in &entries {
            let bytes = self.serializer.serialize(value)?;
            kv.insert(self.namespace.build(key), bytes);
        }

        for backend in &self.backends {
            backend.set(kv.clone(), self.opts.ttl()).await?;
        }

        Ok(())
    }

    /// 批量读取，按链路级联
    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    pub async fn get(&self, keys: &[String]) -> Result<HashMap<String, T>> {
        let ns_keys = self.namespace.build_all(keys);

        // 第一层先查找，miss的key集合投递到下一层，直到全部命中或链路耗尽
        let mut found: HashMap<String, Vec<u8>> = HashMap::new();
        let mut miss_keys = ns_keys.clone();
        let mut prev_backend: Option<&Arc<dyn Backend>> = None;
        for backend in &self.backends {
            if miss_keys.is_empty() {
                break;
            }

            let hits = backend.get(&miss_keys).await?;

            if !hits.is_empty() {
                // 上一层miss、本层命中，回写上一层
                if let Some(prev) = prev_backend {
                    if let Err(e) = prev.set(hits.clone(), self.opts.ttl()).await {
                        self.log_population_failure("backfill", &e);
                    }
                }
                found.extend(hits);
            }

            miss_keys = ns_keys
                .iter()
                .filter(|k| !found.contains_key(*k))
                .cloned()
                .collect();
            prev_backend = Some(backend);
        }

        let mut out = HashMap::with_capacity(found.len());
        for (key, bytes) in found {
            let value = self.serializer.deserialize(&bytes)?;
            out.insert(self.namespace.split(&key), value);
        }

        Ok(out)
    }

    /// 批量读取，缓存miss时调用resolver从权威数据源加载
    ///
    /// 级联和回写封装在get/set原语内部，回源逻辑与层级无关
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
    ///
    /// 从每一层删除给定key，在第一个失败的层停止
    #[instrument(skip(self, keys), level = "debug", fields(key_count = keys.len()))]
    pub async fn del(&self, keys: &[String]) -> Result<()> {
        let ns_keys = self.namespace.build_all(keys);
        for backend in &self.backends {
            backend.del(&ns_keys).await?;
        }

        Ok(())
    }

    fn log_population_failure(&self, op: &str, err: &CacheError) {
        if self.opts.enable_log {
            warn!("cache population failed in {}: {}", op, err);
        }
    }
}

#[async_trait]
impl<T> TypedCache<T> for MultiCache<T>
where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    async fn set(&self, entries: HashMap<String, T>) -> Result<()> {
        MultiCache::set(self, entries).await
    }

    async fn get(&self, keys: &[String]) -> Result<HashMap<String, T>> {
        MultiCache::get(self, keys).await
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
        MultiCache::get_and_set(self, keys, resolver).await
    }

    async fn get_and_set_single<F, Fut>(&self, key: &str, resolver: F) -> Result<(T, bool)>
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(T, bool)>> + Send + 'static,
    {
        MultiCache::get_and_set_single(self, key, resolver).await
    }

    async fn del(&self, keys: &[String]) -> Result<()> {
        MultiCache::del(self, keys).await
    }
}
