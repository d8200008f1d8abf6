//! tiercache - 类型化多层缓存编排库
//!
//! 在一个或多个异构的字节存储后端之上提供统一的类型化get/set/del接口，
//! 写入对每一层透明扇出，读取沿链路级联并自动回写更快的层，
//! 同key并发回源合并为一次执行，并可选缓存零值防止缓存穿透。

#![doc(html_root_url = "https://docs.rs/tiercache/0.1.0")]

pub use serde;
pub use serde::{Deserialize, Serialize};
pub use serde_json;
pub use tokio;

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod key;
pub mod serialization;
pub mod sync;

// Re-export commonly used items
pub use backend::{Backend, MemoryBackend, RedisBackend};
pub use client::{Cache, MultiCache, TypedCache};
pub use config::{CacheOptions, RedisConfig};
pub use error::{CacheError, Result};
pub use serialization::{JsonSerializer, Serializer, SerializerEnum};
pub use sync::FlightGroup;

/// tiercache 版本号
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
