//! Equality query filters

use crate::types::{Item, OwnerColumn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single `column = value` condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub value: Value,
}

/// Conjunction (AND) of equality conditions
///
/// The empty filter restricts nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryFilter {
    conditions: Vec<Condition>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a `column = value` condition
    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Merge two filters; both must hold
    pub fn and(mut self, other: QueryFilter) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Evaluate the filter against an in-memory item
    ///
    /// `owner_fk` names the column backed by the item's ownership key; `id`
    /// reads the item id and every other column reads the attribute map.
    /// Missing columns never match.
    pub fn matches(&self, item: &Item, owner_fk: &str) -> bool {
        self.conditions.iter().all(|condition| {
            let actual = if condition.column == owner_fk {
                match item.owner {
                    OwnerColumn::Owner(id) => Some(Value::from(id)),
                    OwnerColumn::Unset => Some(Value::Null),
                    OwnerColumn::Absent => None,
                }
            } else if condition.column == "id" {
                Some(Value::from(item.id))
            } else {
                item.attribute(&condition.column).cloned()
            };

            actual.as_ref() == Some(&condition.value)
        })
    }
}
