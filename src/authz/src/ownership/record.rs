//! Record storage used for referenced-ownership checks

use super::QueryFilter;
use crate::error::Result;
use crate::types::{Item, ItemId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;

/// Loads records of any resource class by id
#[async_trait]
pub trait RecordLoader: Send + Sync {
    async fn find(&self, resource: &str, id: ItemId) -> Result<Option<Item>>;
}

/// Thread-safe record store backed by DashMap
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    records: Arc<DashMap<(String, ItemId), Item>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record
    pub fn insert(&self, resource: impl Into<String>, item: Item) {
        self.records.insert((resource.into(), item.id), item);
    }

    /// Records of `resource` passing `filter`, ordered by id
    pub fn list(&self, resource: &str, filter: &QueryFilter, owner_fk: &str) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == resource)
            .filter(|entry| filter.matches(entry.value(), owner_fk))
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|item| item.id);
        items
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordLoader for InMemoryRecordStore {
    async fn find(&self, resource: &str, id: ItemId) -> Result<Option<Item>> {
        Ok(self
            .records
            .get(&(resource.to_string(), id))
            .map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find() {
        let store = InMemoryRecordStore::new();
        store.insert("Post", Item::new(1).with_owner(7));
        store.insert("Comment", Item::new(1));

        let post = store.find("Post", 1).await.unwrap().unwrap();
        assert_eq!(post.owner_id(), Some(7));
        assert!(store.find("Post", 2).await.unwrap().is_none());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_list_applies_filter() {
        let store = InMemoryRecordStore::new();
        store.insert("Post", Item::new(3).with_owner(7));
        store.insert("Post", Item::new(1).with_owner(7));
        store.insert("Post", Item::new(2).with_owner(9));
        store.insert("Comment", Item::new(4).with_owner(7));

        let filter = QueryFilter::new().where_eq("admin_user_id", 7u64);
        let ids: Vec<_> = store
            .list("Post", &filter, "admin_user_id")
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);

        assert_eq!(store.list("Post", &QueryFilter::new(), "admin_user_id").len(), 3);
    }
}
