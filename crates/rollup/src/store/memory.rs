use std::{
    collections::HashMap,
    sync::{
        Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;

use super::{AggregateStore, ResultStore};
use crate::AggregateStoreError;

#[derive(Debug)]
enum Slot {
    Bytes(Vec<u8>),
    Hash(HashMap<String, i64>),
}

/// Process-local Aggregate Store.
///
/// Each method runs in a single critical section, which makes `hash_incr`
/// atomic. [`set_offline`](Self::set_offline) simulates an outage: every
/// call fails with [`AggregateStoreError::Unavailable`] until switched back.
#[derive(Debug, Default)]
pub struct MemoryAggregateStore {
    slots: Mutex<HashMap<String, Slot>>,
    offline: AtomicBool,
}

impl MemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slots(&self) -> ResultStore<MutexGuard<'_, HashMap<String, Slot>>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AggregateStoreError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        self.slots
            .lock()
            .map_err(|_| AggregateStoreError::Unavailable("memory store poisoned".to_string()))
    }
}

fn wrong_type(key: &str) -> AggregateStoreError {
    AggregateStoreError::Corrupt(format!("{key} holds the wrong kind of value"))
}

fn hash_mut<'a>(
    slots: &'a mut HashMap<String, Slot>,
    key: &str,
) -> ResultStore<&'a mut HashMap<String, i64>> {
    match slots
        .entry(key.to_string())
        .or_insert_with(|| Slot::Hash(HashMap::new()))
    {
        Slot::Hash(fields) => Ok(fields),
        Slot::Bytes(_) => Err(wrong_type(key)),
    }
}

#[async_trait]
impl AggregateStore for MemoryAggregateStore {
    async fn get(&self, key: &str) -> ResultStore<Option<Vec<u8>>> {
        match self.slots()?.get(key) {
            None => Ok(None),
            Some(Slot::Bytes(bytes)) => Ok(Some(bytes.clone())),
            Some(Slot::Hash(_)) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> ResultStore<()> {
        self.slots()?.insert(key.to_string(), Slot::Bytes(value));
        Ok(())
    }

    async fn del(&self, key: &str) -> ResultStore<()> {
        self.slots()?.remove(key);
        Ok(())
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> ResultStore<i64> {
        let mut slots = self.slots()?;
        let value = hash_mut(&mut slots, key)?
            .entry(field.to_string())
            .or_insert(0);
        *value += delta;
        Ok(*value)
    }

    async fn hash_set(&self, key: &str, field: &str, value: i64) -> ResultStore<()> {
        let mut slots = self.slots()?;
        hash_mut(&mut slots, key)?.insert(field.to_string(), value);
        Ok(())
    }

    async fn hash_get(&self, key: &str, field: &str) -> ResultStore<Option<i64>> {
        match self.slots()?.get(key) {
            None => Ok(None),
            Some(Slot::Hash(fields)) => Ok(fields.get(field).copied()),
            Some(Slot::Bytes(_)) => Err(wrong_type(key)),
        }
    }

    async fn hash_del(&self, key: &str, field: &str) -> ResultStore<()> {
        let mut slots = self.slots()?;
        let now_empty = match slots.get_mut(key) {
            None => return Ok(()),
            Some(Slot::Hash(fields)) => {
                fields.remove(field);
                fields.is_empty()
            }
            Some(Slot::Bytes(_)) => return Err(wrong_type(key)),
        };
        if now_empty {
            slots.remove(key);
        }
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> ResultStore<HashMap<String, i64>> {
        match self.slots()?.get(key) {
            None => Ok(HashMap::new()),
            Some(Slot::Hash(fields)) => Ok(fields.clone()),
            Some(Slot::Bytes(_)) => Err(wrong_type(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bytes_set_get_del() {
        let store = MemoryAggregateStore::new();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", b"v".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v".to_vec()));
        store.del("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn hash_increments_from_zero() {
        let store = MemoryAggregateStore::new();
        assert_eq!(store.hash_incr("h", "a", 5).await.unwrap(), 5);
        assert_eq!(store.hash_incr("h", "a", -7).await.unwrap(), -2);
        assert_eq!(store.hash_get("h", "a").await.unwrap(), Some(-2));
        assert_eq!(store.hash_get("h", "b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleting_last_field_drops_the_key() {
        let store = MemoryAggregateStore::new();
        store.hash_set("h", "a", 1).await.unwrap();
        store.hash_del("h", "a").await.unwrap();
        assert!(store.is_empty());
        assert!(store.hash_get_all("h").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mixing_kinds_is_reported() {
        let store = MemoryAggregateStore::new();
        store.set("k", b"v".to_vec()).await.unwrap();
        assert!(matches!(
            store.hash_incr("k", "f", 1).await,
            Err(AggregateStoreError::Corrupt(_))
        ));
    }

    #[tokio::test]
    async fn offline_fails_every_call() {
        let store = MemoryAggregateStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.get("k").await,
            Err(AggregateStoreError::Unavailable(_))
        ));
        assert!(store.hash_incr("h", "f", 1).await.is_err());
        store.set_offline(false);
        assert!(store.get("k").await.is_ok());
    }
}
