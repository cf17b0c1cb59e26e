//! Generic in-memory repository
//!
//! A map from id to entity behind a `tokio::sync::RwLock`. Handy as a
//! stand-in wherever a real store is unnecessary.

use std::collections::HashMap;
use tokio::sync::RwLock;

use super::RepoError;
use crate::models::Entity;

struct Inner<T> {
    data: HashMap<i64, T>,
    next_id: i64,
}

pub struct InMemoryRepository<T> {
    inner: RwLock<Inner<T>>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner {
                data: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl<T> InMemoryRepository<T>
where
    T: Entity + Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entity`, assigning the next free id when `id() <= 0`.
    /// Returns the stored copy.
    pub async fn save(&self, mut entity: T) -> T {
        let mut inner = self.inner.write().await;

        if entity.id() <= 0 {
            entity.set_id(inner.next_id);
        }
        inner.next_id = inner.next_id.max(entity.id() + 1);
        inner.data.insert(entity.id(), entity.clone());

        entity
    }

    pub async fn get_by_id(&self, id: i64) -> Result<T, RepoError> {
        let inner = self.inner.read().await;
        inner
            .data
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound { id })
    }

    /// Remove the entity with `id`; returns whether one was present.
    pub async fn delete(&self, id: i64) -> bool {
        self.inner.write().await.data.remove(&id).is_some()
    }

    /// All entities ordered by id
    pub async fn all(&self) -> Vec<T> {
        let inner = self.inner.read().await;
        let mut items: Vec<T> = inner.data.values().cloned().collect();
        items.sort_by_key(|e| e.id());
        items
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.data.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
