//! Ownership policy
//!
//! Decides whether an actor owns or relates to an item, builds listing
//! filters restricted to owned items, and stamps ownership on writes. The
//! root role bypasses every ownership restriction.

mod filter;
mod record;

pub use filter::{Condition, QueryFilter};
pub use record::{InMemoryRecordStore, RecordLoader};

use crate::capability::RoleCapabilityTable;
use crate::engine::Verdict;
use crate::error::{AuthzError, Result};
use crate::message::{MessageKey, MessageParams};
use crate::schema::ResourceSchemaProvider;
use crate::types::{Actor, Item, ItemId, OwnerColumn, Resource};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OwnershipPolicy {
    table: Arc<RoleCapabilityTable>,
    owner_fk: String,
}

impl OwnershipPolicy {
    /// Create a policy using `owner_fk` as the ownership column name
    pub fn new(table: Arc<RoleCapabilityTable>, owner_fk: impl Into<String>) -> Self {
        Self {
            table,
            owner_fk: owner_fk.into(),
        }
    }

    pub fn owner_fk(&self) -> &str {
        &self.owner_fk
    }

    /// Restrict a listing to the actor's own items
    ///
    /// `existing` is returned untouched for root, for resources without the
    /// "only user items" flag, and for resources without an ownership
    /// column; otherwise `owner_fk = actor.id` is ANDed onto it. The same
    /// filter bounds previous/next navigation between items.
    pub fn filter_for_listing(
        &self,
        actor: &Actor,
        resource: &Resource,
        existing: QueryFilter,
    ) -> QueryFilter {
        if self.table.is_root_actor(actor)
            || !resource.only_user_items_flag()
            || !resource.declares_ownership_fk()
        {
            return existing;
        }

        debug!(
            "Restricting {} listing to items of actor {}",
            resource.class, actor.id
        );
        existing.and(QueryFilter::new().where_eq(self.owner_fk.as_str(), actor.id))
    }

    /// Whether the actor may touch this item
    ///
    /// Denies when the item has an owning-users relation the actor is not a
    /// member of, or an ownership column that does not name the actor.
    /// Items with neither relation pass.
    pub fn check_ownership(&self, actor: &Actor, item: &Item) -> Verdict {
        if self.table.is_root_actor(actor) {
            return Verdict::Allow;
        }

        let outside_relation = item.declares_owner_relation() && !item.related_to(actor);
        let not_owner = item.declares_ownership_fk() && !item.owned_by(actor);

        if outside_relation || not_owner {
            debug!(
                "Actor {} does not own item {} (relation={}, fk={})",
                actor.id, item.id, outside_relation, not_owner
            );
            return Verdict::deny(
                MessageKey::NoPermissionForItem,
                MessageParams::new().role(actor.role.as_str()),
            );
        }

        Verdict::Allow
    }

    /// Check ownership of a record referenced by resource class and id
    /// rather than the primary item
    ///
    /// # Errors
    ///
    /// - [`AuthzError::UnknownResource`] when the class is not registered
    /// - [`AuthzError::RecordNotFound`] when the record does not exist
    /// - [`AuthzError::NotOwner`] when the record declares an owner other
    ///   than a non-root actor
    pub async fn check_referenced_ownership(
        &self,
        schemas: &dyn ResourceSchemaProvider,
        records: &dyn RecordLoader,
        resource_class: &str,
        resource_id: ItemId,
        actor: &Actor,
    ) -> Result<()> {
        let resource = schemas.require(resource_class)?;
        if !resource.declares_ownership_fk() {
            return Ok(());
        }

        let item = records
            .find(resource_class, resource_id)
            .await?
            .ok_or_else(|| AuthzError::RecordNotFound {
                resource: resource_class.to_string(),
                id: resource_id,
            })?;

        if item.owned_by(actor) || self.table.is_root_actor(actor) {
            return Ok(());
        }

        debug!(
            "Actor {} is not owner of referenced {} #{}",
            actor.id, resource_class, resource_id
        );
        Err(AuthzError::NotOwner {
            resource: resource_class.to_string(),
            id: resource_id,
        })
    }

    /// Stamp a new item with its creator, root included
    pub fn set_attributes_on_create(&self, actor: &Actor, item: &mut Item, resource: &Resource) {
        if resource.declares_ownership_fk() {
            item.owner = OwnerColumn::Owner(actor.id);
        }
    }

    /// Force the owner of an updated item back to a non-root actor, so an
    /// update payload cannot hand the item to someone else
    pub fn set_attributes_on_update(&self, actor: &Actor, item: &mut Item, resource: &Resource) {
        if resource.declares_ownership_fk() && !self.table.is_root_actor(actor) {
            item.owner = OwnerColumn::Owner(actor.id);
        }
    }
}
