//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了并发去重协调器，将同一key的并发回源请求合并为一次执行。

use crate::error::{CacheError, Result};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// 单次回源的共享结果
///
/// 成功时为 (值, 是否找到)，失败时所有并发调用方共享同一个错误实例
pub type FlightOutcome<T> = std::result::Result<(T, bool), Arc<CacheError>>;

struct Flight<T> {
    cell: OnceCell<FlightOutcome<T>>,
}

/// 并发去重协调器
///
/// 以调用方可见的逻辑key为粒度：同一key同时至多有一次回源在执行，
/// 期间到达的调用方等待该次执行完成并观察到相同的结果。
/// 执行结束后登记项即被移除，后续的独立调用会触发新的回源。
/// 不同key之间互不阻塞。
pub struct FlightGroup<T> {
    flights: DashMap<String, Arc<Flight<T>>>,
}

impl<T> Default for FlightGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FlightGroup<T> {
    /// 创建新的协调器
    pub fn new() -> Self {
        Self {
            flights: DashMap::new(),
        }
    }

    /// 当前在途的回源数量
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }
}

impl<T> FlightGroup<T>
where
    T: Clone + Send + Sync,
{
    /// 执行或等待key对应的回源
    ///
    /// # 参数
    ///
    /// * `key` - 逻辑key（未加前缀）
    /// * `f` - 回源操作，至多被并发调用方中的一个执行
    pub async fn run<F, Fut>(&self, key: &str, f: F) -> FlightOutcome<T>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<(T, bool)>> + Send,
    {
        let flight = self
            .flights
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Flight {
                    cell: OnceCell::new(),
                })
            })
            .clone();

        let outcome = flight
            .cell
            .get_or_init(|| async move { f().await.map_err(Arc::new) })
            .await
            .clone();

        // 只移除本次登记的flight，避免误删后续新登记的
        self.flights
            .remove_if(key, |_, in_flight| Arc::ptr_eq(in_flight, &flight));

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Barrier;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_calls_share_one_execution() {
        let group = Arc::new(FlightGroup::<String>::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let concurrency = 32;
        let barrier = Arc::new(Barrier::new(concurrency));

        let mut handles = Vec::new();
        for _ in 0..concurrency {
            let group = group.clone();
            let calls = calls.clone();
            let barrier = barrier.clone();
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                group
                    .run("hot", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                        Ok(("value".to_string(), true))
                    })
                    .await
            }));
        }

        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            assert_eq!(outcome, ("value".to_string(), true));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(group.in_flight(), 0);
    }

    #[tokio::test]
    async fn completed_flight_does_not_cache_result() {
        let group = FlightGroup::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let calls = calls.clone();
            let outcome = group
                .run("k", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok((7, true))
                })
                .await;
            assert_eq!(outcome.unwrap(), (7, true));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn error_is_shared_verbatim() {
        let group = FlightGroup::<u32>::new();
        let outcome = group
            .run("k", || async move {
                Err(CacheError::BackendError("boom".to_string()))
            })
            .await;
        let err = outcome.unwrap_err();
        assert!(matches!(*err, CacheError::BackendError(_)));
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let group = Arc::new(FlightGroup::<u32>::new());
        let slow = {
            let group = group.clone();
            tokio::spawn(async move {
                group
                    .run("slow", || async move {
                        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                        Ok((1, true))
                    })
                    .await
            })
        };
        let fast = group.run("fast", || async move { Ok((2, true)) }).await;
        assert_eq!(fast.unwrap(), (2, true));
        assert_eq!(slow.await.unwrap().unwrap(), (1, true));
    }
}
