//! Error types for the authorization gate

use crate::engine::Denial;
use crate::types::{ActorId, ItemId};
use thiserror::Error;

/// Authorization gate errors
///
/// Every variant maps to a redirect at the gate; none of them is fatal to
/// the process.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// No identity token in the session
    #[error("Login required")]
    RequiresLogin { return_to: Option<String> },

    /// The actor's role is no longer present in the capability table
    #[error("Role no longer exists: {role}")]
    RoleNotFound {
        role: String,
        return_to: Option<String>,
    },

    /// The actor's account has been disabled
    #[error("Account {actor_id} has been disabled")]
    AccountDisabled {
        actor_id: ActorId,
        return_to: Option<String>,
    },

    /// The session names an actor that does not exist
    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),

    /// A referenced record is owned by someone else
    #[error("Not owner of {resource} #{id}")]
    NotOwner { resource: String, id: ItemId },

    /// The action was denied by the decision table
    #[error("Action denied: {}", .0.key)]
    ActionDenied(Denial),

    /// A referenced record does not exist
    #[error("Record not found: {resource} #{id}")]
    RecordNotFound { resource: String, id: ItemId },

    /// No descriptor is registered for a resource class
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Backing store failure
    #[error("Store error: {0}")]
    Store(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// Whether this error means the session can no longer be trusted.
    pub fn invalidates_session(&self) -> bool {
        matches!(
            self,
            Self::RoleNotFound { .. } | Self::AccountDisabled { .. } | Self::ActorNotFound(_)
        )
    }

    /// Path the sign-in page should send the actor back to, if any.
    pub fn return_to(&self) -> Option<&str> {
        match self {
            Self::RequiresLogin { return_to }
            | Self::RoleNotFound { return_to, .. }
            | Self::AccountDisabled { return_to, .. } => return_to.as_deref(),
            _ => None,
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_errors_invalidate_session() {
        let role = AuthzError::RoleNotFound {
            role: "ghost".to_string(),
            return_to: None,
        };
        let disabled = AuthzError::AccountDisabled {
            actor_id: 3,
            return_to: Some("/admin/posts".to_string()),
        };

        assert!(role.invalidates_session());
        assert!(disabled.invalidates_session());
        assert!(AuthzError::ActorNotFound(9).invalidates_session());

        assert!(!AuthzError::RequiresLogin { return_to: None }.invalidates_session());
        assert!(!AuthzError::NotOwner {
            resource: "Post".to_string(),
            id: 1
        }
        .invalidates_session());
    }

    #[test]
    fn test_return_to() {
        let err = AuthzError::AccountDisabled {
            actor_id: 3,
            return_to: Some("/admin/posts?page=2".to_string()),
        };
        assert_eq!(err.return_to(), Some("/admin/posts?page=2"));
        assert_eq!(AuthzError::ActorNotFound(1).return_to(), None);
    }
}
