use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Provider, ProviderError, RequestContext};
use crate::identity::Entity;

/// Map-backed provider keeping entities in insertion order.
///
/// A single mutex serializes every operation. The first `list` after a
/// mutation snapshots all entries; later lists slice that snapshot until the
/// next create, update or delete invalidates it.
pub struct MemoryProvider<E> {
    inner: Mutex<Store<E>>,
}

struct Store<E> {
    entries: HashMap<String, E>,
    order: Vec<String>,
    cache: Option<Arc<Vec<E>>>,
}

impl<E> Store<E> {
    fn invalidate(&mut self) {
        self.cache = None;
    }
}

impl<E: Entity + Clone> MemoryProvider<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Store {
                entries: HashMap::new(),
                order: Vec::new(),
                cache: None,
            }),
        }
    }

    /// Provider pre-filled with `entities`. Entities without an identity get one.
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let provider = Self::new();
        {
            let mut store = provider.inner.lock();
            for mut entity in entities {
                if entity.identity().is_empty() {
                    entity.set_identity(uuid::Uuid::new_v4().to_string());
                }
                let id = entity.identity().to_owned();
                if store.entries.insert(id.clone(), entity).is_none() {
                    store.order.push(id);
                }
            }
        }
        provider
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a list snapshot is currently held.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.inner.lock().cache.is_some()
    }
}

impl<E: Entity + Clone> Default for MemoryProvider<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity + Clone + Default> Provider<E> for MemoryProvider<E> {
    async fn create(&self, _ctx: &RequestContext, mut entity: E) -> Result<E, ProviderError> {
        let mut store = self.inner.lock();
        if entity.identity().is_empty() {
            entity.set_identity(uuid::Uuid::new_v4().to_string());
        }
        let id = entity.identity().to_owned();
        if store.entries.contains_key(&id) {
            return Err(ProviderError::rejected(
                "conflict",
                format!("entity `{id}` already exists"),
            ));
        }

        store.entries.insert(id.clone(), entity.clone());
        store.order.push(id);
        store.invalidate();
        Ok(entity)
    }

    async fn get(&self, _ctx: &RequestContext, id: &str) -> Result<E, ProviderError> {
        if id.is_empty() {
            return Ok(E::default());
        }
        self.inner
            .lock()
            .entries
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(id))
    }

    async fn update(&self, _ctx: &RequestContext, entity: E) -> Result<(), ProviderError> {
        let mut store = self.inner.lock();
        let Some(slot) = store.entries.get_mut(entity.identity()) else {
            return Err(ProviderError::not_found(entity.identity()));
        };
        *slot = entity;
        store.invalidate();
        Ok(())
    }

    async fn delete(&self, _ctx: &RequestContext, id: &str) -> Result<(), ProviderError> {
        let mut store = self.inner.lock();
        if store.entries.remove(id).is_some() {
            store.order.retain(|k| k != id);
            store.invalidate();
        }
        Ok(())
    }

    async fn list(&self, _ctx: &RequestContext, offset: usize, limit: usize) -> Result<Vec<E>, ProviderError> {
        let mut store = self.inner.lock();
        let snapshot = match store.cache.clone() {
            Some(cached) => cached,
            None => {
                let all: Vec<E> = store
                    .order
                    .iter()
                    .filter_map(|id| store.entries.get(id).cloned())
                    .collect();
                let all = Arc::new(all);
                store.cache = Some(Arc::clone(&all));
                tracing::debug!(entries = all.len(), "rebuilt list cache");
                all
            }
        };
        Ok(snapshot.iter().skip(offset).take(limit).cloned().collect())
    }
}
