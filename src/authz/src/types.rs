//! Core authorization types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unique actor identifier
pub type ActorId = u64;

/// Unique item identifier
pub type ItemId = u64;

/// Free-form record attributes (form payloads, column values)
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// Per-actor preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Preferred locale code (e.g., "en", "es")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

/// Authenticated administrative user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identifier
    pub id: ActorId,

    /// Contact email
    #[serde(default)]
    pub email: String,

    /// Role name, a key into the capability table
    pub role: String,

    /// Active (`true`) or disabled (`false`)
    #[serde(default = "default_status")]
    pub status: bool,

    #[serde(default)]
    pub preferences: Preferences,
}

fn default_status() -> bool {
    true
}

impl Actor {
    /// Create an active actor with the given role
    pub fn new(id: ActorId, role: impl Into<String>) -> Self {
        Self {
            id,
            email: String::new(),
            role: role.into(),
            status: true,
            preferences: Preferences::default(),
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.preferences.locale = Some(locale.into());
        self
    }

    /// Mark the actor as disabled
    pub fn disabled(mut self) -> Self {
        self.status = false;
        self
    }
}

/// Kind of administrable resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Regular data model
    #[default]
    Model,
    /// The model backing the actors themselves
    Users,
    /// Operational target with no backing model (e.g., a git or cache panel)
    Special,
}

/// Descriptor of an administrable entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Class identifier (e.g., "Post")
    pub class: String,

    /// Human readable name; derived from the class when empty
    #[serde(default)]
    pub human_name: String,

    #[serde(default)]
    pub kind: ResourceKind,

    /// Declares a single ownership foreign key column
    #[serde(default)]
    pub ownership_fk: bool,

    /// Declares a many-to-many owning-users relation
    #[serde(default)]
    pub owner_relation: bool,

    /// Listings show only the actor's own items
    #[serde(default)]
    pub only_user_items: bool,
}

impl Resource {
    /// Create a plain model resource
    pub fn model(class: impl Into<String>) -> Self {
        Self::with_kind(class, ResourceKind::Model)
    }

    /// Create the user-type resource
    pub fn users(class: impl Into<String>) -> Self {
        Self::with_kind(class, ResourceKind::Users)
    }

    /// Create an operational resource
    pub fn special(class: impl Into<String>) -> Self {
        Self::with_kind(class, ResourceKind::Special)
    }

    fn with_kind(class: impl Into<String>, kind: ResourceKind) -> Self {
        let class = class.into();
        Self {
            human_name: humanize(&class),
            class,
            kind,
            ownership_fk: false,
            owner_relation: false,
            only_user_items: false,
        }
    }

    pub fn with_ownership_fk(mut self) -> Self {
        self.ownership_fk = true;
        self
    }

    pub fn with_owner_relation(mut self) -> Self {
        self.owner_relation = true;
        self
    }

    pub fn with_only_user_items(mut self) -> Self {
        self.only_user_items = true;
        self
    }

    pub fn declares_ownership_fk(&self) -> bool {
        self.ownership_fk
    }

    pub fn declares_owner_relation(&self) -> bool {
        self.owner_relation
    }

    pub fn only_user_items_flag(&self) -> bool {
        self.only_user_items
    }

    pub fn human_name(&self) -> &str {
        if self.human_name.is_empty() {
            &self.class
        } else {
            &self.human_name
        }
    }

    pub fn is_user_resource(&self) -> bool {
        self.kind == ResourceKind::Users
    }

    pub fn is_special(&self) -> bool {
        self.kind == ResourceKind::Special
    }
}

/// Turn a class name like "BlogPost" into "Blog post"
pub(crate) fn humanize(class: &str) -> String {
    let mut out = String::with_capacity(class.len() + 4);
    for (idx, ch) in class.chars().enumerate() {
        if ch == '_' {
            out.push(' ');
        } else if ch.is_uppercase() && idx > 0 {
            out.push(' ');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// State of an item's ownership foreign key column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerColumn {
    /// The item has no ownership column
    #[default]
    Absent,
    /// The column exists but holds no owner
    Unset,
    /// The column names an owner
    Owner(ActorId),
}

/// A concrete instance of a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,

    #[serde(default)]
    pub owner: OwnerColumn,

    /// Members of the owning-users relation, when the item declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owning_users: Option<BTreeSet<ActorId>>,

    #[serde(default)]
    pub attributes: Attributes,
}

impl Item {
    /// Create an item with no ownership relations
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            owner: OwnerColumn::Absent,
            owning_users: None,
            attributes: Attributes::new(),
        }
    }

    pub fn with_owner(mut self, owner: ActorId) -> Self {
        self.owner = OwnerColumn::Owner(owner);
        self
    }

    /// Declare an ownership column without an owner
    pub fn with_unset_owner(mut self) -> Self {
        self.owner = OwnerColumn::Unset;
        self
    }

    pub fn with_owning_users(mut self, users: impl IntoIterator<Item = ActorId>) -> Self {
        self.owning_users = Some(users.into_iter().collect());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn declares_ownership_fk(&self) -> bool {
        self.owner != OwnerColumn::Absent
    }

    pub fn declares_owner_relation(&self) -> bool {
        self.owning_users.is_some()
    }

    pub fn owner_id(&self) -> Option<ActorId> {
        match self.owner {
            OwnerColumn::Owner(id) => Some(id),
            _ => None,
        }
    }

    /// Whether the ownership column names this actor
    pub fn owned_by(&self, actor: &Actor) -> bool {
        self.owner_id() == Some(actor.id)
    }

    /// Whether this actor belongs to the owning-users relation
    pub fn related_to(&self, actor: &Actor) -> bool {
        self.owning_users
            .as_ref()
            .is_some_and(|users| users.contains(&actor.id))
    }

    /// For user-type items, whether this item is the actor's own record
    pub fn is_actor(&self, actor: &Actor) -> bool {
        self.id == actor.id
    }

    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    /// Role stored on a user-type item
    pub fn role(&self) -> Option<&str> {
        self.attribute("role").and_then(|v| v.as_str())
    }
}
