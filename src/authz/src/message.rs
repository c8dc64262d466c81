//! Deny message keys and rendering
//!
//! Decisions carry opaque keys plus interpolation parameters. Rendering is a
//! collaborator concern; [`DefaultFormatter`] ships English templates for the
//! demo server and for logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a user-facing message
///
/// Serialized as its catalogue key (e.g. `"authz.cannot_go_to"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum MessageKey {
    NotAdminOrOwner,
    CannotChangeOwnRole,
    CannotToggleOwnStatus,
    ToggleNotAllowed,
    CannotRemoveSelf,
    RemoveNotAllowed,
    CannotDisplayItems,
    CannotDeleteItem,
    CannotPerformAction,
    CannotGoTo,
    NoPermissionForItem,
    NotOwnerOfRecord,
    RoleNoLongerExists,
    AccountDisabled,
    SessionExpired,
    RecordNotFound,
    Unavailable,
}

impl MessageKey {
    pub const ALL: [MessageKey; 17] = [
        Self::NotAdminOrOwner,
        Self::CannotChangeOwnRole,
        Self::CannotToggleOwnStatus,
        Self::ToggleNotAllowed,
        Self::CannotRemoveSelf,
        Self::RemoveNotAllowed,
        Self::CannotDisplayItems,
        Self::CannotDeleteItem,
        Self::CannotPerformAction,
        Self::CannotGoTo,
        Self::NoPermissionForItem,
        Self::NotOwnerOfRecord,
        Self::RoleNoLongerExists,
        Self::AccountDisabled,
        Self::SessionExpired,
        Self::RecordNotFound,
        Self::Unavailable,
    ];

    /// Key handed to the external message catalogue
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAdminOrOwner => "authz.not_admin_or_owner",
            Self::CannotChangeOwnRole => "authz.cannot_change_own_role",
            Self::CannotToggleOwnStatus => "authz.cannot_toggle_own_status",
            Self::ToggleNotAllowed => "authz.toggle_not_allowed",
            Self::CannotRemoveSelf => "authz.cannot_remove_self",
            Self::RemoveNotAllowed => "authz.remove_not_allowed",
            Self::CannotDisplayItems => "authz.cannot_display_items",
            Self::CannotDeleteItem => "authz.cannot_delete_item",
            Self::CannotPerformAction => "authz.cannot_perform_action",
            Self::CannotGoTo => "authz.cannot_go_to",
            Self::NoPermissionForItem => "authz.no_permission_for_item",
            Self::NotOwnerOfRecord => "authz.not_owner_of_record",
            Self::RoleNoLongerExists => "session.role_no_longer_exists",
            Self::AccountDisabled => "session.account_disabled",
            Self::SessionExpired => "session.expired",
            Self::RecordNotFound => "authz.record_not_found",
            Self::Unavailable => "authz.unavailable",
        }
    }

    /// English template with `{role}`, `{action}` and `{resource}` slots
    pub fn default_template(&self) -> &'static str {
        match self {
            Self::NotAdminOrOwner => {
                "As you're not the admin or the owner of this record you cannot edit it."
            }
            Self::CannotChangeOwnRole => "You can't change your role.",
            Self::CannotToggleOwnStatus => "You can't toggle your status.",
            Self::ToggleNotAllowed => "You're not allowed to toggle status.",
            Self::CannotRemoveSelf => "You can't remove yourself.",
            Self::RemoveNotAllowed => "You're not allowed to remove {resource}.",
            Self::CannotDisplayItems => "{role} can't display items.",
            Self::CannotDeleteItem => "{role} can't delete this item.",
            Self::CannotPerformAction => "{role} can't perform action. ({action})",
            Self::CannotGoTo => "{role} can't go to {action} on {resource}.",
            Self::NoPermissionForItem => "You don't have permission to access this item.",
            Self::NotOwnerOfRecord => "You're not owner of this record.",
            Self::RoleNoLongerExists => "Role does no longer exist.",
            Self::AccountDisabled => "Your account has been disabled.",
            Self::SessionExpired => "Your session is no longer valid.",
            Self::RecordNotFound => "The requested record could not be found.",
            Self::Unavailable => "Authorization could not be completed.",
        }
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MessageKey> for &'static str {
    fn from(key: MessageKey) -> Self {
        key.as_str()
    }
}

impl FromStr for MessageKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown message key: {}", s))
    }
}

impl TryFrom<String> for MessageKey {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Interpolation parameters for a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
}

impl MessageParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }
}

/// Renders message keys into user-facing text
pub trait MessageFormatter: Send + Sync {
    fn format(&self, key: MessageKey, params: &MessageParams) -> String;
}

/// English formatter; capitalizes the role name
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatter;

impl MessageFormatter for DefaultFormatter {
    fn format(&self, key: MessageKey, params: &MessageParams) -> String {
        let role = params.role.as_deref().map(capitalize).unwrap_or_default();
        key.default_template()
            .replace("{role}", &role)
            .replace("{action}", params.action.as_deref().unwrap_or_default())
            .replace("{resource}", params.resource.as_deref().unwrap_or_default())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_role_message() {
        let text = DefaultFormatter.format(
            MessageKey::CannotDisplayItems,
            &MessageParams::new().role("editor"),
        );
        assert_eq!(text, "Editor can't display items.");
    }

    #[test]
    fn test_format_special_resource_message() {
        let params = MessageParams::new()
            .role("designer")
            .action("pull")
            .resource("git");
        let text = DefaultFormatter.format(MessageKey::CannotGoTo, &params);
        assert_eq!(text, "Designer can't go to pull on git.");
    }

    #[test]
    fn test_format_action_message() {
        let params = MessageParams::new().role("EDITOR").action("export_csv");
        let text = DefaultFormatter.format(MessageKey::CannotPerformAction, &params);
        assert_eq!(text, "Editor can't perform action. (export_csv)");
    }

    #[test]
    fn test_keys_are_unique() {
        use std::collections::HashSet;
        let unique: HashSet<_> = MessageKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(unique.len(), MessageKey::ALL.len());
    }

    #[test]
    fn test_serialized_key_matches_catalogue_key() {
        for key in MessageKey::ALL {
            let json = serde_json::to_value(key).unwrap();
            assert_eq!(json, serde_json::Value::from(key.as_str()));
            assert_eq!(json, serde_json::Value::from(key.to_string()));

            let parsed: MessageKey = serde_json::from_value(json).unwrap();
            assert_eq!(parsed, key);
        }

        assert!(serde_json::from_str::<MessageKey>("\"cannot_go_to\"").is_err());
    }
}
