//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了类型化缓存的契约和编排器实现。

pub mod multi_tier;
pub mod single_tier;

use crate::error::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;

pub use multi_tier::MultiCache;
pub use single_tier::Cache;

/// 类型化缓存契约
///
/// 单层和多层编排器实现同一契约，调用方不感知层级结构。
/// 泛型参数T为缓存的值类型，编排层从不检视其内部结构。
#[async_trait]
pub trait TypedCache<T>: Send + Sync
where
    T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static,
{
    /// 批量写入
    async fn set(&self, entries: HashMap<String, T>) -> Result<()>;

    /// 批量读取
    ///
    /// 未命中的key不出现在返回结果中，不算错误
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, T>>;

    /// 批量读取，缓存miss时调用resolver从权威数据源加载
    async fn get_and_set<F, Fut>(
        &self,
        keys: &[String],
        resolver: F,
    ) -> Result<HashMap<String, T>>
    where
        F: FnOnce(Vec<String>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<HashMap<String, T>>> + Send + 'static;

    /// 单key读取，缓存miss时经并发去重后调用resolver加载
    ///
    /// 返回的bool是resolver自身的found标志，调用方可以区分
    /// "resolver未找到" 和 "resolver找到了"
    async fn get_and_set_single<F, Fut>(&self, key: &str, resolver: F) -> Result<(T, bool)>
    where
        F: FnOnce(String) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(T, bool)>> + Send + 'static;

    /// 批量删除
    async fn del(&self, keys: &[String]) -> Result<()>;
}
