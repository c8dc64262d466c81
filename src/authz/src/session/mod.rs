//! Session identity resolution
//!
//! Turns the identity token stored in the session into a validated [`Actor`],
//! or reports that the caller has to sign in again. Any integrity violation
//! (unknown actor, stale role, disabled account) clears the session.

mod memory;
mod resolver;

pub use memory::{InMemoryActorStore, MemorySession, SharedLocale, TaskLocale};
pub use resolver::SessionIdentityResolver;

use crate::error::{AuthzError, Result};
use crate::types::{Actor, ActorId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-request session holding the identity token
pub trait SessionStore: Send {
    fn actor_id(&self) -> Option<ActorId>;

    fn set_actor_id(&mut self, id: ActorId);

    /// Drop the identity token
    fn clear(&mut self);
}

/// Actor storage backend
#[async_trait]
pub trait ActorLoader: Send + Sync {
    async fn load_by_id(&self, id: ActorId) -> Result<Option<Actor>>;

    /// Re-read an actor from storage
    async fn reload(&self, actor: &Actor) -> Result<Actor> {
        self.load_by_id(actor.id)
            .await?
            .ok_or(AuthzError::ActorNotFound(actor.id))
    }
}

/// Receiver of the request-scoped active locale
pub trait LocaleSink: Send + Sync {
    fn set_active_locale(&self, locale: &str);
}

/// Request data the gate needs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestInfo {
    /// Path without query string
    pub path: String,

    /// Full request URI including query string; falls back to `path`
    #[serde(default)]
    pub uri: String,

    /// Referring page, if known
    #[serde(default)]
    pub referer: Option<String>,
}

impl RequestInfo {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn full_uri(&self) -> &str {
        if self.uri.is_empty() {
            &self.path
        } else {
            &self.uri
        }
    }
}
