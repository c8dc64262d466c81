//! Action vocabulary and its resource-family projections

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Action requested on a resource
///
/// Parsing is total: names outside the standard vocabulary become
/// [`Action::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Index,
    Show,
    New,
    Create,
    Edit,
    Update,
    Toggle,
    Position,
    Relate,
    Unrelate,
    Detach,
    Destroy,
    Remove,
    Custom(String),
}

/// CRUD permission an action needs on a model resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Create,
    Read,
    Update,
    Delete,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Actions carrying self-modification rules on the user-type resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Edit,
    Update,
    Toggle,
    Destroy,
}

/// Message family for generic capability denials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericAction {
    /// index, show
    Display,
    /// destroy
    Delete,
    Other,
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Index => "index",
            Self::Show => "show",
            Self::New => "new",
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Update => "update",
            Self::Toggle => "toggle",
            Self::Position => "position",
            Self::Relate => "relate",
            Self::Unrelate => "unrelate",
            Self::Detach => "detach",
            Self::Destroy => "destroy",
            Self::Remove => "remove",
            Self::Custom(name) => name,
        }
    }

    /// CRUD permission checked against model grants; `None` for custom
    /// actions, which are granted by name.
    pub fn permission(&self) -> Option<Permission> {
        match self {
            Self::New | Self::Create => Some(Permission::Create),
            Self::Index | Self::Show => Some(Permission::Read),
            Self::Edit
            | Self::Update
            | Self::Position
            | Self::Toggle
            | Self::Relate
            | Self::Unrelate
            | Self::Detach => Some(Permission::Update),
            Self::Remove | Self::Destroy => Some(Permission::Delete),
            Self::Custom(_) => None,
        }
    }

    /// Grant name looked up in a model resource's grant list
    pub fn grant_name(&self) -> &str {
        match self.permission() {
            Some(permission) => permission.as_str(),
            None => self.as_str(),
        }
    }

    pub fn as_user_action(&self) -> Option<UserAction> {
        match self {
            Self::Edit => Some(UserAction::Edit),
            Self::Update => Some(UserAction::Update),
            Self::Toggle => Some(UserAction::Toggle),
            Self::Destroy => Some(UserAction::Destroy),
            _ => None,
        }
    }

    pub fn generic(&self) -> GenericAction {
        match self {
            Self::Index | Self::Show => GenericAction::Display,
            Self::Destroy => GenericAction::Delete,
            _ => GenericAction::Other,
        }
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        match name {
            "index" => Self::Index,
            "show" => Self::Show,
            "new" => Self::New,
            "create" => Self::Create,
            "edit" => Self::Edit,
            "update" => Self::Update,
            "toggle" => Self::Toggle,
            "position" => Self::Position,
            "relate" => Self::Relate,
            "unrelate" => Self::Unrelate,
            "detach" => Self::Detach,
            "destroy" => Self::Destroy,
            "remove" => Self::Remove,
            other => Self::Custom(other.to_string()),
        }
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.as_str().to_string()
    }
}

impl FromStr for Action {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
