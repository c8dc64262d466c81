//! Action authorizer
//!
//! Combines role capability, item ownership and the self-modification rules
//! on the user-type resource into a single verdict.
//!
//! # Decision order
//!
//! ```text
//! special resource ─────────────────────────► special capability
//! item of a model resource ─► ownership ──┐
//! item of the user resource ─► self rules ├─► model capability
//! no item ────────────────────────────────┘
//! ```
//!
//! The first deny wins. The authorizer is a pure function of its inputs.

pub mod action;
pub mod decision;

pub use action::{Action, GenericAction, Permission, UserAction};
pub use decision::{AuthorizationContext, Denial, Verdict};

use crate::capability::RoleCapabilityTable;
use crate::config::GateConfig;
use crate::message::MessageKey;
use crate::ownership::OwnershipPolicy;
use crate::types::Item;
use std::sync::Arc;
use tracing::debug;

/// The authorization decision engine
#[derive(Debug, Clone)]
pub struct ActionAuthorizer {
    table: Arc<RoleCapabilityTable>,
    ownership: OwnershipPolicy,
    config: Arc<GateConfig>,
}

impl ActionAuthorizer {
    pub fn new(table: Arc<RoleCapabilityTable>, config: Arc<GateConfig>) -> Self {
        let ownership = OwnershipPolicy::new(Arc::clone(&table), config.owner_fk.clone());
        Self {
            table,
            ownership,
            config,
        }
    }

    pub fn table(&self) -> &RoleCapabilityTable {
        &self.table
    }

    pub fn ownership(&self) -> &OwnershipPolicy {
        &self.ownership
    }

    /// Decide whether the actor may perform the action
    pub fn authorize(&self, ctx: &AuthorizationContext<'_>) -> Verdict {
        debug!(
            "Authorizing actor={} role={} action={} resource={} item={:?}",
            ctx.actor.id,
            ctx.actor.role,
            ctx.action,
            ctx.resource.class,
            ctx.item.map(|item| item.id)
        );

        if ctx.resource.is_special() {
            return self.special_rule(ctx);
        }

        if let Some(item) = ctx.item {
            if ctx.resource.is_user_resource() {
                if let Some(key) = ctx
                    .action
                    .as_user_action()
                    .and_then(|action| self.user_rule(action, ctx, item))
                {
                    return self.deny(key, ctx);
                }
            } else if !self.config.is_ownership_exempt(&ctx.action)
                && !self.ownership.check_ownership(ctx.actor, item).is_allowed()
            {
                return self.deny(MessageKey::NoPermissionForItem, ctx);
            }
        }

        self.capability_rule(ctx)
    }

    /// Self-modification rules on the user-type resource
    fn user_rule(
        &self,
        action: UserAction,
        ctx: &AuthorizationContext<'_>,
        item: &Item,
    ) -> Option<MessageKey> {
        let is_root = self.table.is_root_actor(ctx.actor);
        let is_self = item.is_actor(ctx.actor);

        match action {
            UserAction::Edit if !is_root && !is_self => Some(MessageKey::NotAdminOrOwner),
            UserAction::Edit => None,
            UserAction::Update if is_self && role_changed(ctx, item) => {
                Some(MessageKey::CannotChangeOwnRole)
            }
            UserAction::Update => None,
            UserAction::Toggle if !is_root => Some(MessageKey::ToggleNotAllowed),
            UserAction::Toggle if is_self => Some(MessageKey::CannotToggleOwnStatus),
            UserAction::Toggle => None,
            UserAction::Destroy if !is_root => Some(MessageKey::RemoveNotAllowed),
            UserAction::Destroy if is_self => Some(MessageKey::CannotRemoveSelf),
            UserAction::Destroy => None,
        }
    }

    fn capability_rule(&self, ctx: &AuthorizationContext<'_>) -> Verdict {
        if self
            .table
            .can_perform(&ctx.actor.role, &ctx.action, &ctx.resource.class, false)
        {
            return Verdict::Allow;
        }

        let key = match ctx.action.generic() {
            GenericAction::Display => MessageKey::CannotDisplayItems,
            GenericAction::Delete => MessageKey::CannotDeleteItem,
            GenericAction::Other => MessageKey::CannotPerformAction,
        };
        self.deny(key, ctx)
    }

    fn special_rule(&self, ctx: &AuthorizationContext<'_>) -> Verdict {
        if self
            .table
            .can_perform(&ctx.actor.role, &ctx.action, &ctx.resource.class, true)
        {
            Verdict::Allow
        } else {
            self.deny(MessageKey::CannotGoTo, ctx)
        }
    }

    fn deny(&self, key: MessageKey, ctx: &AuthorizationContext<'_>) -> Verdict {
        debug!("Denied actor={} action={}: {}", ctx.actor.id, ctx.action, key);
        Verdict::deny(key, ctx.message_params())
    }
}

/// Whether the submitted payload changes the item's role
///
/// A missing payload or role field counts as a change: a self-update must
/// resubmit the stored role.
fn role_changed(ctx: &AuthorizationContext<'_>, item: &Item) -> bool {
    let submitted = ctx
        .submitted
        .and_then(|attrs| attrs.get("role"))
        .and_then(|role| role.as_str());
    submitted != item.role()
}
