//! Role capability table
//!
//! Static mapping of role → grants per resource. Model resources and special
//! (operational) resources live in separate namespaces; a grant in one never
//! implies the other. Missing entries deny.

use crate::engine::Action;
use crate::error::{AuthzError, Result};
use crate::types::Actor;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::debug;

/// Default name of the root role
pub const DEFAULT_ROOT_ROLE: &str = "admin";

/// Grant name covering every action on a resource
pub const ALL_ACTIONS: &str = "all";

/// Set of grant names for one resource
///
/// Accepts either a list (`["read", "update"]`) or a comma separated string
/// (`"read, update"`) when deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "GrantList")]
pub struct Grants(BTreeSet<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum GrantList {
    List(Vec<String>),
    Csv(String),
}

impl From<GrantList> for Grants {
    fn from(list: GrantList) -> Self {
        let names: Vec<String> = match list {
            GrantList::List(names) => names,
            GrantList::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        };
        names.iter().map(String::as_str).collect()
    }
}

impl<'a> FromIterator<&'a str> for Grants {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl Grants {
    /// Whether `name` (or `all`) is granted
    pub fn allows(&self, name: &str) -> bool {
        self.0.contains(ALL_ACTIONS) || self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Grants held by one role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrants {
    /// Model resource class → CRUD or custom action grants
    #[serde(default)]
    pub models: HashMap<String, Grants>,

    /// Special resource name → raw action grants
    #[serde(default)]
    pub special: HashMap<String, Grants>,
}

#[derive(Debug, Deserialize)]
struct RoleTableFile {
    #[serde(default = "default_root_role")]
    root_role: String,

    #[serde(default)]
    roles: HashMap<String, RoleGrants>,
}

fn default_root_role() -> String {
    DEFAULT_ROOT_ROLE.to_string()
}

/// Immutable role → capability mapping, loaded once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCapabilityTable {
    root_role: String,
    roles: HashMap<String, RoleGrants>,
}

impl Default for RoleCapabilityTable {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_ROLE)
    }
}

impl RoleCapabilityTable {
    /// Create a table holding only the root role
    pub fn new(root_role: impl Into<String>) -> Self {
        let root_role = root_role.into();
        let mut roles = HashMap::new();
        roles.insert(root_role.clone(), RoleGrants::default());
        Self { root_role, roles }
    }

    /// Build a table from parsed role grants
    ///
    /// The root role is added when the grants do not mention it.
    pub fn from_grants(
        root_role: impl Into<String>,
        grants: HashMap<String, RoleGrants>,
    ) -> Result<Self> {
        let mut table = Self::new(root_role);
        if table.root_role.trim().is_empty() {
            return Err(AuthzError::Config("root role cannot be empty".to_string()));
        }

        for (role, role_grants) in grants {
            if role.trim().is_empty() {
                return Err(AuthzError::Config("role name cannot be empty".to_string()));
            }
            table.roles.insert(role, role_grants);
        }

        debug!("Capability table loaded with {} roles", table.roles.len());
        Ok(table)
    }

    /// Parse a table from TOML
    ///
    /// ```toml
    /// root_role = "admin"
    ///
    /// [roles.editor.models]
    /// Post = ["read", "create", "update", "delete"]
    /// Category = "read, update"
    ///
    /// [roles.editor.special]
    /// Git = ["index"]
    /// ```
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: RoleTableFile = toml::from_str(s)?;
        Self::from_grants(file.root_role, file.roles)
    }

    /// Load a table from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Grant model-resource actions to a role, creating the role if needed
    pub fn grant(mut self, role: &str, resource: &str, grants: &[&str]) -> Self {
        self.roles
            .entry(role.to_string())
            .or_default()
            .models
            .insert(resource.to_string(), grants.iter().copied().collect());
        self
    }

    /// Grant special-resource actions to a role, creating the role if needed
    pub fn grant_special(mut self, role: &str, resource: &str, grants: &[&str]) -> Self {
        self.roles
            .entry(role.to_string())
            .or_default()
            .special
            .insert(resource.to_string(), grants.iter().copied().collect());
        self
    }

    pub fn root_role(&self) -> &str {
        &self.root_role
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    pub fn is_root(&self, role: &str) -> bool {
        role == self.root_role
    }

    pub fn is_root_actor(&self, actor: &Actor) -> bool {
        self.is_root(&actor.role)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    /// Whether `role` may perform `action` on `resource`
    ///
    /// With `special` set the lookup uses the special namespace and the raw
    /// action name; otherwise the model namespace and the action's CRUD
    /// permission.
    pub fn can_perform(&self, role: &str, action: &Action, resource: &str, special: bool) -> bool {
        if self.is_root(role) {
            return true;
        }

        let Some(grants) = self.roles.get(role) else {
            return false;
        };

        let (namespace, name) = if special {
            (&grants.special, action.as_str())
        } else {
            (&grants.models, action.grant_name())
        };

        let allowed = namespace
            .get(resource)
            .is_some_and(|resource_grants| resource_grants.allows(name));

        debug!(
            "Capability lookup: role={}, action={}, resource={}, special={} -> {}",
            role, action, resource, special, allowed
        );

        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_table() -> RoleCapabilityTable {
        RoleCapabilityTable::default()
            .grant("editor", "Post", &["read", "update"])
            .grant("editor", "Category", &["all"])
            .grant_special("editor", "Git", &["index"])
    }

    #[test]
    fn test_root_always_allowed() {
        let table = editor_table();
        assert!(table.can_perform("admin", &Action::Destroy, "Anything", false));
        assert!(table.can_perform("admin", &Action::from("pull"), "Git", true));
    }

    #[test]
    fn test_root_role_always_present() {
        let table = RoleCapabilityTable::new("root");
        assert!(table.has_role("root"));
        assert!(!table.has_role("admin"));
    }

    #[test]
    fn test_crud_mapping() {
        let table = editor_table();
        assert!(table.can_perform("editor", &Action::Index, "Post", false));
        assert!(table.can_perform("editor", &Action::Toggle, "Post", false));
        assert!(!table.can_perform("editor", &Action::Destroy, "Post", false));
        assert!(!table.can_perform("editor", &Action::Create, "Post", false));
    }

    #[test]
    fn test_all_grant() {
        let table = editor_table();
        assert!(table.can_perform("editor", &Action::Destroy, "Category", false));
        assert!(table.can_perform("editor", &Action::from("export_csv"), "Category", false));
    }

    #[test]
    fn test_namespaces_are_independent() {
        let table = editor_table();
        assert!(table.can_perform("editor", &Action::Index, "Git", true));
        assert!(!table.can_perform("editor", &Action::Index, "Git", false));
        assert!(!table.can_perform("editor", &Action::Index, "Post", true));
    }

    #[test]
    fn test_unknown_role_denied() {
        let table = editor_table();
        assert!(!table.can_perform("ghost", &Action::Index, "Post", false));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            root_role = "root"

            [roles.editor.models]
            Post = ["read", "create"]
            Category = "read, update"

            [roles.editor.special]
            Git = ["index", "pull"]

            [roles.viewer.models]
            Post = "read"
        "#;

        let table = RoleCapabilityTable::from_toml_str(toml).unwrap();
        assert_eq!(table.root_role(), "root");
        assert!(table.has_role("root"));
        assert!(table.has_role("viewer"));
        assert!(table.can_perform("editor", &Action::New, "Post", false));
        assert!(table.can_perform("editor", &Action::Edit, "Category", false));
        assert!(table.can_perform("editor", &Action::from("pull"), "Git", true));
        assert!(!table.can_perform("viewer", &Action::Update, "Post", false));
    }

    #[test]
    fn test_from_toml_rejects_empty_role() {
        let toml = r#"
            [roles." ".models]
            Post = "read"
        "#;
        assert!(matches!(
            RoleCapabilityTable::from_toml_str(toml),
            Err(AuthzError::Config(_))
        ));
    }
}
