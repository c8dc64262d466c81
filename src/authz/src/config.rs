//! Gate configuration
//!
//! Everything is loaded once at process start. A single TOML file can carry
//! the gate settings, the role table, the resource descriptors and, for the
//! demo server, a set of seed actors:
//!
//! ```toml
//! root_role = "admin"
//!
//! [gate]
//! dashboard_path = "/admin/dashboard"
//! owner_fk = "admin_user_id"
//!
//! [roles.editor.models]
//! Post = ["read", "create", "update", "delete"]
//!
//! [[resources]]
//! class = "Post"
//! ownership_fk = true
//! only_user_items = true
//!
//! [[actors]]
//! id = 1
//! role = "admin"
//!
//! [[records]]
//! resource = "Post"
//! id = 10
//! owner = 1
//! ```

use crate::capability::{RoleCapabilityTable, RoleGrants, DEFAULT_ROOT_ROLE};
use crate::engine::Action;
use crate::error::{AuthzError, Result};
use crate::ownership::InMemoryRecordStore;
use crate::schema::{ResourceRegistry, ResourceSchemaProvider};
use crate::types::{Actor, ActorId, Attributes, Item, ItemId, OwnerColumn, Resource};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Paths and column names the gate works with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Landing page; never recorded as a return target
    pub dashboard_path: String,

    /// Admin root; never recorded as a return target
    pub admin_root_path: String,

    pub sign_in_path: String,

    /// Name of the ownership foreign key column
    pub owner_fk: String,

    /// Locale applied when the actor has no preference
    pub default_locale: String,

    /// Actions that skip the item ownership check
    pub ownership_exempt_actions: Vec<Action>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            dashboard_path: "/admin/dashboard".to_string(),
            admin_root_path: "/admin".to_string(),
            sign_in_path: "/admin/session/new".to_string(),
            owner_fk: "admin_user_id".to_string(),
            default_locale: "en".to_string(),
            ownership_exempt_actions: Vec::new(),
        }
    }
}

impl GateConfig {
    pub fn is_ownership_exempt(&self, action: &Action) -> bool {
        self.ownership_exempt_actions.contains(action)
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("dashboard_path", &self.dashboard_path),
            ("sign_in_path", &self.sign_in_path),
            ("owner_fk", &self.owner_fk),
        ] {
            if value.trim().is_empty() {
                return Err(AuthzError::Config(format!("{} cannot be empty", name)));
            }
        }
        Ok(())
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct AuthzConfig {
    #[serde(default)]
    pub gate: GateConfig,

    #[serde(default = "default_root_role")]
    pub root_role: String,

    #[serde(default)]
    pub roles: HashMap<String, RoleGrants>,

    #[serde(default)]
    pub resources: Vec<Resource>,

    /// Actors preloaded into the in-memory actor store
    #[serde(default)]
    pub actors: Vec<Actor>,

    /// Records preloaded into the in-memory record store
    #[serde(default)]
    pub records: Vec<SeedRecord>,
}

/// A record of a registered resource, as written in the config file
///
/// Ownership fields are shaped by the resource descriptor: a resource with
/// an ownership column gets `owner` (unset when omitted), one with an
/// owning-users relation gets `owning_users`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedRecord {
    pub resource: String,

    pub id: ItemId,

    #[serde(default)]
    pub owner: Option<ActorId>,

    #[serde(default)]
    pub owning_users: Vec<ActorId>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl SeedRecord {
    fn to_item(&self, resource: &Resource) -> Item {
        let mut item = Item::new(self.id);
        item.attributes = self.attributes.clone();

        if resource.declares_ownership_fk() {
            item.owner = match self.owner {
                Some(owner) => OwnerColumn::Owner(owner),
                None => OwnerColumn::Unset,
            };
        }
        if resource.declares_owner_relation() {
            item.owning_users = Some(self.owning_users.iter().copied().collect());
        }
        item
    }
}

fn default_root_role() -> String {
    DEFAULT_ROOT_ROLE.to_string()
}

impl AuthzConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.gate.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn capability_table(&self) -> Result<RoleCapabilityTable> {
        RoleCapabilityTable::from_grants(self.root_role.clone(), self.roles.clone())
    }

    pub fn resource_registry(&self) -> Result<ResourceRegistry> {
        ResourceRegistry::from_resources(self.resources.clone())
    }

    /// Record store holding the seed records
    ///
    /// Fails with [`AuthzError::UnknownResource`] when a record names a
    /// resource that is not declared.
    pub fn record_store(&self) -> Result<InMemoryRecordStore> {
        let registry = self.resource_registry()?;
        let store = InMemoryRecordStore::new();

        for record in &self.records {
            let resource = registry.require(&record.resource)?;
            store.insert(record.resource.clone(), record.to_item(resource));
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceKind;
    use std::io::Write;

    const SAMPLE: &str = r#"
        root_role = "admin"

        [gate]
        dashboard_path = "/backoffice"
        ownership_exempt_actions = ["show"]

        [roles.editor.models]
        Post = ["read", "update"]

        [[resources]]
        class = "Post"
        ownership_fk = true
        only_user_items = true

        [[resources]]
        class = "AdminUser"
        kind = "users"

        [[actors]]
        id = 1
        role = "admin"
        email = "admin@example.com"

        [[actors]]
        id = 7
        role = "editor"
        preferences = { locale = "es" }

        [[records]]
        resource = "Post"
        id = 10
        owner = 7
        attributes = { title = "Hello" }

        [[records]]
        resource = "Post"
        id = 11
    "#;

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.dashboard_path, "/admin/dashboard");
        assert_eq!(config.owner_fk, "admin_user_id");
        assert!(!config.is_ownership_exempt(&Action::Show));
    }

    #[test]
    fn test_parse_full_config() {
        let config = AuthzConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.gate.dashboard_path, "/backoffice");
        assert_eq!(config.gate.sign_in_path, "/admin/session/new");
        assert!(config.gate.is_ownership_exempt(&Action::Show));

        let table = config.capability_table().unwrap();
        assert!(table.has_role("admin"));
        assert!(table.can_perform("editor", &Action::Edit, "Post", false));

        let registry = config.resource_registry().unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.get("AdminUser").map(|r| r.kind),
            Some(ResourceKind::Users)
        );

        assert_eq!(config.actors.len(), 2);
        assert_eq!(config.actors[1].preferences.locale.as_deref(), Some("es"));
    }

    #[tokio::test]
    async fn test_seed_records() {
        use crate::ownership::RecordLoader;

        let config = AuthzConfig::from_toml_str(SAMPLE).unwrap();
        let store = config.record_store().unwrap();
        assert_eq!(store.len(), 2);

        let owned = store.find("Post", 10).await.unwrap().unwrap();
        assert_eq!(owned.owner_id(), Some(7));
        assert_eq!(owned.attribute("title"), Some(&serde_json::json!("Hello")));

        let unowned = store.find("Post", 11).await.unwrap().unwrap();
        assert_eq!(unowned.owner, OwnerColumn::Unset);
    }

    #[test]
    fn test_seed_record_for_unknown_resource() {
        let toml = r#"
            [[records]]
            resource = "Tag"
            id = 1
        "#;
        let config = AuthzConfig::from_toml_str(toml).unwrap();
        assert!(matches!(
            config.record_store(),
            Err(AuthzError::UnknownResource(class)) if class == "Tag"
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = AuthzConfig::from_file(file.path()).unwrap();
        assert_eq!(config.resources.len(), 2);
    }

    #[test]
    fn test_rejects_empty_owner_fk() {
        let toml = r#"
            [gate]
            owner_fk = ""
        "#;
        assert!(matches!(
            AuthzConfig::from_toml_str(toml),
            Err(AuthzError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            AuthzConfig::from_file("/nonexistent/authz.toml"),
            Err(AuthzError::Io(_))
        ));
    }
}
