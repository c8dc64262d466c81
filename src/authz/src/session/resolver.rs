//! Session identity resolver

use super::{ActorLoader, LocaleSink, RequestInfo, SessionStore};
use crate::capability::RoleCapabilityTable;
use crate::config::GateConfig;
use crate::error::{AuthzError, Result};
use crate::types::{Actor, Resource};
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves the session's identity token into a validated actor
#[derive(Clone)]
pub struct SessionIdentityResolver {
    table: Arc<RoleCapabilityTable>,
    loader: Arc<dyn ActorLoader>,
    locale: Arc<dyn LocaleSink>,
    config: Arc<GateConfig>,
}

impl SessionIdentityResolver {
    pub fn new(
        table: Arc<RoleCapabilityTable>,
        loader: Arc<dyn ActorLoader>,
        locale: Arc<dyn LocaleSink>,
        config: Arc<GateConfig>,
    ) -> Self {
        Self {
            table,
            loader,
            locale,
            config,
        }
    }

    /// Resolve the current actor
    ///
    /// # Errors
    ///
    /// - [`AuthzError::RequiresLogin`] when the session carries no token
    /// - [`AuthzError::ActorNotFound`], [`AuthzError::RoleNotFound`] and
    ///   [`AuthzError::AccountDisabled`] after clearing the session
    /// - store errors from the actor loader, with the session left intact
    ///
    /// On success the actor's locale becomes the active locale.
    pub async fn resolve(
        &self,
        session: &mut dyn SessionStore,
        request: &RequestInfo,
    ) -> Result<Actor> {
        let Some(actor_id) = session.actor_id() else {
            debug!("No identity token in session for {}", request.path);
            return Err(AuthzError::RequiresLogin {
                return_to: self.login_return_to(&request.path),
            });
        };

        let Some(actor) = self.loader.load_by_id(actor_id).await? else {
            warn!("Session names unknown actor {}, clearing session", actor_id);
            session.clear();
            return Err(AuthzError::ActorNotFound(actor_id));
        };

        if !self.table.has_role(&actor.role) {
            warn!(
                "Actor {} holds role '{}' which no longer exists, clearing session",
                actor.id, actor.role
            );
            session.clear();
            return Err(AuthzError::RoleNotFound {
                role: actor.role,
                return_to: self.unless_dashboard(&request.path),
            });
        }

        if !actor.status {
            warn!("Actor {} is disabled, clearing session", actor.id);
            session.clear();
            return Err(AuthzError::AccountDisabled {
                actor_id: actor.id,
                return_to: self.unless_dashboard(request.full_uri()),
            });
        }

        self.apply_locale(&actor);
        debug!("Resolved actor {} with role '{}'", actor.id, actor.role);

        Ok(actor)
    }

    /// Re-read the actor when acting on the user-type resource, so that a
    /// changed locale preference applies to the response.
    ///
    /// Returns the reloaded actor, or `None` for other resources.
    pub async fn reload_locale(&self, actor: &Actor, resource: &Resource) -> Result<Option<Actor>> {
        if !resource.is_user_resource() {
            return Ok(None);
        }

        let actor = self.loader.reload(actor).await?;
        self.apply_locale(&actor);
        Ok(Some(actor))
    }

    fn apply_locale(&self, actor: &Actor) {
        let locale = actor
            .preferences
            .locale
            .as_deref()
            .unwrap_or(&self.config.default_locale);
        self.locale.set_active_locale(locale);
    }

    /// Return target for a fresh sign-in; the dashboard and admin root are
    /// never recorded.
    fn login_return_to(&self, path: &str) -> Option<String> {
        if path == self.config.dashboard_path || path == self.config.admin_root_path {
            None
        } else {
            Some(path.to_string())
        }
    }

    fn unless_dashboard(&self, target: &str) -> Option<String> {
        if target == self.config.dashboard_path {
            None
        } else {
            Some(target.to_string())
        }
    }
}
