//! Role capability table
//!
//! Leaf data consulted by the ownership policy and the action authorizer.

mod table;

pub use table::{Grants, RoleCapabilityTable, RoleGrants, ALL_ACTIONS, DEFAULT_ROOT_ROLE};
