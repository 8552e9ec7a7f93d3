//! The Aggregate Store: the key-value cache tier in front of the ledger.
//!
//! Values are either opaque byte strings (`get`/`set`) or hashes of integer
//! fields (`hash_*`). Integer fields hold cents or counters.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::AggregateStoreError;

mod memory;
mod sql;

pub use memory::MemoryAggregateStore;
pub use sql::SqlAggregateStore;

pub type ResultStore<T> = Result<T, AggregateStoreError>;

#[async_trait]
pub trait AggregateStore: Send + Sync {
    async fn get(&self, key: &str) -> ResultStore<Option<Vec<u8>>>;

    async fn set(&self, key: &str, value: Vec<u8>) -> ResultStore<()>;

    /// Removes `key`, whatever kind of value it holds.
    async fn del(&self, key: &str) -> ResultStore<()>;

    /// Adds `delta` to `field` (absent fields start at 0) and returns the new
    /// value. Must be atomic with respect to concurrent increments.
    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> ResultStore<i64>;

    async fn hash_set(&self, key: &str, field: &str, value: i64) -> ResultStore<()>;

    async fn hash_get(&self, key: &str, field: &str) -> ResultStore<Option<i64>>;

    async fn hash_del(&self, key: &str, field: &str) -> ResultStore<()>;

    async fn hash_get_all(&self, key: &str) -> ResultStore<HashMap<String, i64>>;
}
