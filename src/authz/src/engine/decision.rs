//! Verdicts and the authorization context

use super::Action;
use crate::error::AuthzError;
use crate::message::{MessageKey, MessageParams};
use crate::types::{Actor, Attributes, Item, Resource};
use serde::{Deserialize, Serialize};

/// Reason attached to a deny verdict
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Denial {
    pub key: MessageKey,

    #[serde(default)]
    pub params: MessageParams,
}

/// Outcome of an authorization decision
///
/// Produced per call and never persisted; equal inputs give equal verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Allow,
    Deny(Denial),
}

impl Verdict {
    pub fn deny(key: MessageKey, params: MessageParams) -> Self {
        Self::Deny(Denial { key, params })
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Self::Allow => None,
            Self::Deny(denial) => Some(denial),
        }
    }

    /// Convert into a `Result`, mapping deny to [`AuthzError::ActionDenied`]
    pub fn into_result(self) -> Result<(), AuthzError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(denial) => Err(AuthzError::ActionDenied(denial)),
        }
    }
}

/// Everything one decision looks at
#[derive(Debug, Clone)]
pub struct AuthorizationContext<'a> {
    pub actor: &'a Actor,
    pub action: Action,
    pub resource: &'a Resource,

    /// Specific item targeted by the action
    pub item: Option<&'a Item>,

    /// Attributes submitted with the request (update payloads)
    pub submitted: Option<&'a Attributes>,
}

impl<'a> AuthorizationContext<'a> {
    pub fn new(actor: &'a Actor, action: impl Into<Action>, resource: &'a Resource) -> Self {
        Self {
            actor,
            action: action.into(),
            resource,
            item: None,
            submitted: None,
        }
    }

    pub fn with_item(mut self, item: &'a Item) -> Self {
        self.item = Some(item);
        self
    }

    pub fn with_submitted(mut self, submitted: &'a Attributes) -> Self {
        self.submitted = Some(submitted);
        self
    }

    /// Interpolation parameters describing this request
    pub fn message_params(&self) -> MessageParams {
        MessageParams::new()
            .role(self.actor.role.as_str())
            .action(self.action.as_str())
            .resource(self.resource.human_name().to_lowercase())
    }
}
