//! # Backoffice Authorization Gate
//!
//! Role- and ownership-based access control for an administrative backend.
//! Decides, per request, whether the signed-in actor may view, modify or
//! destroy a resource, and turns every refusal into a redirect with a
//! message.
//!
//! ## Components
//!
//! - **RoleCapabilityTable** - static role → grants mapping; root bypasses it
//! - **SessionIdentityResolver** - session token → validated [`Actor`]
//! - **OwnershipPolicy** - item ownership checks, listing filters, owner stamping
//! - **ActionAuthorizer** - the decision table producing a [`Verdict`]
//! - **RequestGate** - runs the above per request and yields a [`GateOutcome`]
//!
//! ## Example
//!
//! ```rust
//! use backoffice_authz::{
//!     ActionAuthorizer, Actor, AuthorizationContext, GateConfig, Item, MessageKey, Resource,
//!     RoleCapabilityTable,
//! };
//! use std::sync::Arc;
//!
//! let table = RoleCapabilityTable::default().grant("editor", "Post", &["read", "delete"]);
//! let authorizer = ActionAuthorizer::new(Arc::new(table), Arc::new(GateConfig::default()));
//!
//! let editor = Actor::new(7, "editor");
//! let posts = Resource::model("Post").with_ownership_fk();
//! let theirs = Item::new(1).with_owner(9);
//!
//! let ctx = AuthorizationContext::new(&editor, "destroy", &posts).with_item(&theirs);
//! let verdict = authorizer.authorize(&ctx);
//!
//! assert_eq!(verdict.denial().map(|d| d.key), Some(MessageKey::NoPermissionForItem));
//! ```

pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod message;
pub mod ownership;
pub mod schema;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use capability::RoleCapabilityTable;
pub use config::{AuthzConfig, GateConfig, SeedRecord};
pub use engine::{Action, ActionAuthorizer, AuthorizationContext, Denial, Verdict};
pub use error::{AuthzError, Result};
pub use gate::{GateOutcome, GateTarget, NavigationSink, RequestGate};
pub use message::{DefaultFormatter, MessageFormatter, MessageKey, MessageParams};
pub use ownership::{OwnershipPolicy, QueryFilter, RecordLoader};
pub use schema::{ResourceRegistry, ResourceSchemaProvider};
pub use session::{ActorLoader, LocaleSink, RequestInfo, SessionIdentityResolver, SessionStore};
pub use types::{Actor, ActorId, Attributes, Item, ItemId, OwnerColumn, Resource, ResourceKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
