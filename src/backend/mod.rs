//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了后端适配器契约及其实现。

pub mod memory;
pub mod redis;

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

pub use memory::MemoryBackend;
pub use self::redis::RedisBackend;

/// 后端适配器契约
///
/// 面向单个物理存储的字节批量操作。编排层只依赖该契约，
/// 不感知底层存储的淘汰、复制或重连行为。
///
/// 实现约定：
/// * `get` 未命中的key不出现在返回结果中，不算错误
/// * 空的key集合是no-op，返回空结果而非错误
/// * 返回结果不保证任何key顺序
#[async_trait]
pub trait Backend: Send + Sync {
    /// 批量写入缓存项
    ///
    /// # 参数
    ///
    /// * `entries` - 带命名空间的key到字节的映射
    /// * `ttl` - 过期时间，零值表示不过期
    async fn set(&self, entries: HashMap<String, Vec<u8>>, ttl: Duration) -> Result<()>;

    /// 批量读取缓存项
    async fn get(&self, keys: &[String]) -> Result<HashMap<String, Vec<u8>>>;

    /// 批量删除缓存项
    async fn del(&self, keys: &[String]) -> Result<()>;
}
