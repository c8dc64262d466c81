//! Request gate
//!
//! Runs before the wrapped action: resolves the session identity, asks the
//! authorizer for a verdict, checks a referenced record's ownership when the
//! request names one, and turns every failure into exactly one navigation
//! outcome.
//!
//! ```text
//! Session ─► SessionIdentityResolver ─► Actor
//!                                         │
//! GateTarget ─► ActionAuthorizer ◄────────┘
//!                   │
//!                   ├─ allow ─► referenced ownership ─► Proceed
//!                   └─ deny  ─► Deny (redirect to referer or dashboard)
//! ```

pub mod metrics;

pub use metrics::{GateMetrics, MetricsCollector, OutcomeKind};

use crate::capability::RoleCapabilityTable;
use crate::config::GateConfig;
use crate::engine::{Action, ActionAuthorizer, AuthorizationContext, Denial};
use crate::error::{AuthzError, Result};
use crate::message::{MessageKey, MessageParams};
use crate::ownership::{QueryFilter, RecordLoader};
use crate::schema::ResourceSchemaProvider;
use crate::session::{ActorLoader, LocaleSink, RequestInfo, SessionIdentityResolver, SessionStore};
use crate::types::{Actor, Attributes, Item, ItemId, Resource};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Record addressed through separate resource / resource-id parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedRecord {
    pub resource: String,
    pub id: ItemId,
}

/// What the request wants to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateTarget {
    pub action: Action,

    /// Resource class
    pub resource: String,

    #[serde(default)]
    pub item: Option<Item>,

    #[serde(default)]
    pub submitted: Option<Attributes>,

    #[serde(default)]
    pub referenced: Option<ReferencedRecord>,
}

impl GateTarget {
    pub fn new(action: impl Into<Action>, resource: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            item: None,
            submitted: None,
            referenced: None,
        }
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_submitted(mut self, submitted: Attributes) -> Self {
        self.submitted = Some(submitted);
        self
    }

    pub fn with_referenced(mut self, resource: impl Into<String>, id: ItemId) -> Self {
        self.referenced = Some(ReferencedRecord {
            resource: resource.into(),
            id,
        });
        self
    }
}

/// Externally visible result of gating a request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateOutcome {
    /// Run the wrapped action as this actor
    Proceed { actor: Actor },

    /// Navigate away with a message; the session is kept
    Deny { denial: Denial, redirect_to: String },

    /// Send the caller to the sign-in page
    RequireLogin {
        sign_in_path: String,
        return_to: Option<String>,
        notice: Option<Denial>,
    },
}

impl GateOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Proceed { .. } => OutcomeKind::Proceed,
            Self::Deny { .. } => OutcomeKind::Deny,
            Self::RequireLogin { .. } => OutcomeKind::RequireLogin,
        }
    }

    pub fn actor(&self) -> Option<&Actor> {
        match self {
            Self::Proceed { actor } => Some(actor),
            _ => None,
        }
    }

    /// Message attached to a deny or sign-in redirect
    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Self::Proceed { .. } => None,
            Self::Deny { denial, .. } => Some(denial),
            Self::RequireLogin { notice, .. } => notice.as_ref(),
        }
    }

    /// Hand a redirect to the sink; returns the actor when the request may
    /// proceed
    pub fn dispatch(self, sink: &mut dyn NavigationSink) -> Option<Actor> {
        match self {
            Self::Proceed { actor } => Some(actor),
            Self::Deny { denial, redirect_to } => {
                sink.deny(denial.key, &denial.params, &redirect_to);
                None
            }
            Self::RequireLogin {
                return_to, notice, ..
            } => {
                sink.require_login(return_to.as_deref(), notice.as_ref());
                None
            }
        }
    }
}

/// Collaborator performing redirects
pub trait NavigationSink {
    fn deny(&mut self, key: MessageKey, params: &MessageParams, redirect_to: &str);

    fn require_login(&mut self, return_to: Option<&str>, notice: Option<&Denial>);
}

/// Per-request authorization orchestrator
#[derive(Clone)]
pub struct RequestGate {
    resolver: SessionIdentityResolver,
    authorizer: ActionAuthorizer,
    schemas: Arc<dyn ResourceSchemaProvider>,
    records: Arc<dyn RecordLoader>,
    config: Arc<GateConfig>,
    metrics: MetricsCollector,
}

impl RequestGate {
    pub fn new(
        config: GateConfig,
        table: RoleCapabilityTable,
        schemas: Arc<dyn ResourceSchemaProvider>,
        actors: Arc<dyn ActorLoader>,
        records: Arc<dyn RecordLoader>,
        locale: Arc<dyn LocaleSink>,
    ) -> Self {
        let config = Arc::new(config);
        let table = Arc::new(table);

        Self {
            resolver: SessionIdentityResolver::new(
                Arc::clone(&table),
                actors,
                locale,
                Arc::clone(&config),
            ),
            authorizer: ActionAuthorizer::new(table, Arc::clone(&config)),
            schemas,
            records,
            config,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn resolver(&self) -> &SessionIdentityResolver {
        &self.resolver
    }

    pub fn authorizer(&self) -> &ActionAuthorizer {
        &self.authorizer
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Gate one request
    pub async fn enforce(
        &self,
        session: &mut dyn SessionStore,
        request: &RequestInfo,
        target: &GateTarget,
    ) -> GateOutcome {
        let start = Instant::now();

        let outcome = match self.evaluate(session, request, target).await {
            Ok(actor) => {
                info!(
                    "Gate: proceed actor={} action={} resource={}",
                    actor.id, target.action, target.resource
                );
                GateOutcome::Proceed { actor }
            }
            Err(err) => {
                if err.invalidates_session() {
                    self.metrics.record_session_invalidated().await;
                }
                self.outcome_for_error(err, request, target)
            }
        };

        self.metrics.record_outcome(outcome.kind()).await;
        self.metrics.record_latency(start.elapsed()).await;

        outcome
    }

    async fn evaluate(
        &self,
        session: &mut dyn SessionStore,
        request: &RequestInfo,
        target: &GateTarget,
    ) -> Result<Actor> {
        let actor = self.resolver.resolve(session, request).await?;
        let resource = self.schemas.require(&target.resource)?;

        {
            let mut ctx = AuthorizationContext::new(&actor, target.action.clone(), resource);
            if let Some(item) = &target.item {
                ctx = ctx.with_item(item);
            }
            if let Some(submitted) = &target.submitted {
                ctx = ctx.with_submitted(submitted);
            }
            self.authorizer.authorize(&ctx).into_result()?;
        }

        if let Some(reference) = &target.referenced {
            self.authorizer
                .ownership()
                .check_referenced_ownership(
                    self.schemas.as_ref(),
                    self.records.as_ref(),
                    &reference.resource,
                    reference.id,
                    &actor,
                )
                .await?;
        }

        Ok(actor)
    }

    fn outcome_for_error(
        &self,
        err: AuthzError,
        request: &RequestInfo,
        target: &GateTarget,
    ) -> GateOutcome {
        let sign_in_path = self.config.sign_in_path.clone();
        let redirect_to = request
            .referer
            .clone()
            .unwrap_or_else(|| self.config.dashboard_path.clone());

        let outcome = match err {
            AuthzError::RequiresLogin { return_to } => GateOutcome::RequireLogin {
                sign_in_path,
                return_to,
                notice: None,
            },
            AuthzError::RoleNotFound { role, return_to } => GateOutcome::RequireLogin {
                sign_in_path,
                return_to,
                notice: Some(notice(MessageKey::RoleNoLongerExists, MessageParams::new().role(role))),
            },
            AuthzError::AccountDisabled { return_to, .. } => GateOutcome::RequireLogin {
                sign_in_path,
                return_to,
                notice: Some(notice(MessageKey::AccountDisabled, MessageParams::new())),
            },
            AuthzError::ActorNotFound(_) => GateOutcome::RequireLogin {
                sign_in_path,
                return_to: None,
                notice: Some(notice(MessageKey::SessionExpired, MessageParams::new())),
            },
            AuthzError::ActionDenied(denial) => GateOutcome::Deny {
                denial,
                redirect_to,
            },
            AuthzError::NotOwner { resource, .. } => GateOutcome::Deny {
                denial: notice(
                    MessageKey::NotOwnerOfRecord,
                    MessageParams::new()
                        .action(target.action.as_str())
                        .resource(resource),
                ),
                redirect_to,
            },
            AuthzError::RecordNotFound { resource, .. } => GateOutcome::Deny {
                denial: notice(
                    MessageKey::RecordNotFound,
                    MessageParams::new()
                        .action(target.action.as_str())
                        .resource(resource),
                ),
                redirect_to,
            },
            other => {
                error!("Gate could not authorize {}: {}", request.path, other);
                GateOutcome::Deny {
                    denial: notice(MessageKey::Unavailable, MessageParams::new()),
                    redirect_to,
                }
            }
        };

        if let Some(denial) = outcome.denial() {
            info!(
                "Gate: {:?} for {} ({})",
                outcome.kind(),
                request.path,
                denial.key
            );
        }

        outcome
    }

    /// Listing filter for the current actor on a resource class
    pub fn listing_filter(
        &self,
        actor: &Actor,
        resource_class: &str,
        existing: QueryFilter,
    ) -> Result<QueryFilter> {
        let resource = self.schemas.require(resource_class)?;
        Ok(self
            .authorizer
            .ownership()
            .filter_for_listing(actor, resource, existing))
    }

    /// Ownership bookkeeping before an item is created
    pub fn prepare_create(&self, actor: &Actor, item: &mut Item, resource_class: &str) -> Result<()> {
        let resource = self.schemas.require(resource_class)?;
        self.authorizer
            .ownership()
            .set_attributes_on_create(actor, item, resource);
        Ok(())
    }

    /// Ownership bookkeeping before an item is updated
    pub fn prepare_update(&self, actor: &Actor, item: &mut Item, resource_class: &str) -> Result<()> {
        let resource = self.schemas.require(resource_class)?;
        self.authorizer
            .ownership()
            .set_attributes_on_update(actor, item, resource);
        Ok(())
    }

    /// Re-apply the actor's locale after acting on the user-type resource
    pub async fn reload_locale(&self, actor: &Actor, resource: &Resource) -> Result<Option<Actor>> {
        self.resolver.reload_locale(actor, resource).await
    }
}

fn notice(key: MessageKey, params: MessageParams) -> Denial {
    Denial { key, params }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ownership::InMemoryRecordStore;
    use crate::schema::ResourceRegistry;
    use crate::session::{InMemoryActorStore, MemorySession, SharedLocale};

    #[derive(Default)]
    struct RecordingSink {
        denied: Vec<(MessageKey, String)>,
        logins: Vec<Option<String>>,
    }

    impl NavigationSink for RecordingSink {
        fn deny(&mut self, key: MessageKey, _params: &MessageParams, redirect_to: &str) {
            self.denied.push((key, redirect_to.to_string()));
        }

        fn require_login(&mut self, return_to: Option<&str>, _notice: Option<&Denial>) {
            self.logins.push(return_to.map(str::to_string));
        }
    }

    fn gate() -> RequestGate {
        let table = RoleCapabilityTable::default().grant("editor", "Post", &["read"]);
        let schemas = ResourceRegistry::from_resources([Resource::model("Post").with_ownership_fk()])
            .unwrap();
        let actors = InMemoryActorStore::with_actors([Actor::new(7, "editor")]);

        RequestGate::new(
            GateConfig::default(),
            table,
            Arc::new(schemas),
            Arc::new(actors),
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(SharedLocale::new("en")),
        )
    }

    #[tokio::test]
    async fn test_proceed() {
        let gate = gate();
        let mut session = MemorySession::signed_in(7);

        let outcome = gate
            .enforce(&mut session, &RequestInfo::new("/admin/posts"), &GateTarget::new("index", "Post"))
            .await;
        assert_eq!(outcome.actor().map(|a| a.id), Some(7));
    }

    #[tokio::test]
    async fn test_deny_redirects_to_referer_or_dashboard() {
        let gate = gate();
        let mut session = MemorySession::signed_in(7);
        let target = GateTarget::new("destroy", "Post");

        let outcome = gate
            .enforce(&mut session, &RequestInfo::new("/admin/posts/1"), &target)
            .await;
        assert!(matches!(
            outcome,
            GateOutcome::Deny { ref redirect_to, .. } if redirect_to == "/admin/dashboard"
        ));

        let request = RequestInfo::new("/admin/posts/1").with_referer("/admin/posts");
        let mut sink = RecordingSink::default();
        let actor = gate.enforce(&mut session, &request, &target).await.dispatch(&mut sink);

        assert!(actor.is_none());
        assert_eq!(
            sink.denied,
            vec![(MessageKey::CannotDeleteItem, "/admin/posts".to_string())]
        );
        assert_eq!(session.actor_id(), Some(7));
    }

    #[tokio::test]
    async fn test_unknown_resource_is_denied() {
        let gate = gate();
        let mut session = MemorySession::signed_in(7);

        let outcome = gate
            .enforce(&mut session, &RequestInfo::new("/admin/tags"), &GateTarget::new("index", "Tag"))
            .await;
        assert_eq!(outcome.denial().map(|d| d.key), Some(MessageKey::Unavailable));
    }

    #[tokio::test]
    async fn test_require_login_dispatch() {
        let gate = gate();
        let mut session = MemorySession::new();
        let mut sink = RecordingSink::default();

        let actor = gate
            .enforce(&mut session, &RequestInfo::new("/admin/posts"), &GateTarget::new("index", "Post"))
            .await
            .dispatch(&mut sink);

        assert!(actor.is_none());
        assert_eq!(sink.logins, vec![Some("/admin/posts".to_string())]);
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let gate = gate();

        gate.enforce(
            &mut MemorySession::signed_in(7),
            &RequestInfo::new("/admin/posts"),
            &GateTarget::new("index", "Post"),
        )
        .await;
        gate.enforce(
            &mut MemorySession::signed_in(99),
            &RequestInfo::new("/admin/posts"),
            &GateTarget::new("index", "Post"),
        )
        .await;

        let metrics = gate.metrics().snapshot().await;
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.proceeded, 1);
        assert_eq!(metrics.login_required, 1);
        assert_eq!(metrics.sessions_invalidated, 1);
    }
}
