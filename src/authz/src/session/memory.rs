//! In-memory session collaborators

use super::{ActorLoader, LocaleSink, SessionStore};
use crate::error::Result;
use crate::types::{Actor, ActorId};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

/// Session holding only the identity token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemorySession {
    actor_id: Option<ActorId>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(actor_id: ActorId) -> Self {
        Self {
            actor_id: Some(actor_id),
        }
    }
}

impl SessionStore for MemorySession {
    fn actor_id(&self) -> Option<ActorId> {
        self.actor_id
    }

    fn set_actor_id(&mut self, id: ActorId) {
        self.actor_id = Some(id);
    }

    fn clear(&mut self) {
        self.actor_id = None;
    }
}

/// Thread-safe actor store backed by DashMap
#[derive(Debug, Clone, Default)]
pub struct InMemoryActorStore {
    actors: Arc<DashMap<ActorId, Actor>>,
}

impl InMemoryActorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_actors(actors: impl IntoIterator<Item = Actor>) -> Self {
        let store = Self::new();
        for actor in actors {
            store.insert(actor);
        }
        store
    }

    /// Insert or replace an actor
    pub fn insert(&self, actor: Actor) {
        self.actors.insert(actor.id, actor);
    }

    pub fn remove(&self, id: ActorId) -> Option<Actor> {
        self.actors.remove(&id).map(|(_, actor)| actor)
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }
}

#[async_trait]
impl ActorLoader for InMemoryActorStore {
    async fn load_by_id(&self, id: ActorId) -> Result<Option<Actor>> {
        Ok(self.actors.get(&id).map(|entry| entry.value().clone()))
    }
}

/// Shared active-locale cell
///
/// Process-wide: every clone sees the last locale set by any request. Fits
/// a single request flow or tests; concurrent servers use [`TaskLocale`].
#[derive(Debug, Clone)]
pub struct SharedLocale {
    current: Arc<RwLock<String>>,
}

impl SharedLocale {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            current: Arc::new(RwLock::new(initial.into())),
        }
    }

    pub fn current(&self) -> String {
        self.current.read().clone()
    }
}

impl LocaleSink for SharedLocale {
    fn set_active_locale(&self, locale: &str) {
        *self.current.write() = locale.to_string();
    }
}

tokio::task_local! {
    static ACTIVE_LOCALE: RefCell<Option<String>>;
}

/// Locale sink scoped to the current request task
///
/// The locale set while gating is only visible inside the enclosing
/// [`TaskLocale::scope`], so concurrent requests never see each other's.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskLocale;

impl TaskLocale {
    /// Run `fut` with its own locale slot; returns the output and the
    /// locale it set, if any
    pub async fn scope<F: Future>(fut: F) -> (F::Output, Option<String>) {
        ACTIVE_LOCALE
            .scope(RefCell::new(None), async move {
                let output = fut.await;
                let locale = ACTIVE_LOCALE.with(|slot| slot.borrow_mut().take());
                (output, locale)
            })
            .await
    }
}

impl LocaleSink for TaskLocale {
    fn set_active_locale(&self, locale: &str) {
        let applied = ACTIVE_LOCALE.try_with(|slot| *slot.borrow_mut() = Some(locale.to_string()));
        if applied.is_err() {
            debug!("Locale '{}' set outside a request scope, ignored", locale);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_session() {
        let mut session = MemorySession::new();
        assert_eq!(session.actor_id(), None);

        session.set_actor_id(4);
        assert_eq!(session.actor_id(), Some(4));

        session.clear();
        assert_eq!(session, MemorySession::new());
    }

    #[tokio::test]
    async fn test_actor_store() {
        let store = InMemoryActorStore::with_actors([Actor::new(1, "admin"), Actor::new(2, "editor")]);
        assert_eq!(store.len(), 2);

        let loaded = store.load_by_id(2).await.unwrap().unwrap();
        assert_eq!(loaded.role, "editor");
        assert!(store.load_by_id(3).await.unwrap().is_none());

        store.insert(Actor::new(2, "editor").with_locale("fr"));
        let reloaded = store.reload(&loaded).await.unwrap();
        assert_eq!(reloaded.preferences.locale.as_deref(), Some("fr"));

        store.remove(2);
        assert!(store.reload(&loaded).await.is_err());
    }

    #[test]
    fn test_shared_locale() {
        let locale = SharedLocale::new("en");
        let handle = locale.clone();
        handle.set_active_locale("es");
        assert_eq!(locale.current(), "es");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_task_locale_is_per_scope() {
        use std::time::Duration;

        let spanish = tokio::spawn(TaskLocale::scope(async {
            TaskLocale.set_active_locale("es");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }));
        let german = tokio::spawn(TaskLocale::scope(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            TaskLocale.set_active_locale("de");
        }));

        assert_eq!(spanish.await.unwrap().1.as_deref(), Some("es"));
        assert_eq!(german.await.unwrap().1.as_deref(), Some("de"));

        let ((), untouched) = TaskLocale::scope(async {}).await;
        assert_eq!(untouched, None);

        // No scope, nothing to apply to
        TaskLocale.set_active_locale("fr");
    }
}
