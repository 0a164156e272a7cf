//! Typed item filters.
//!
//! Line queries are expressed as a closed set of criteria instead of
//! free-form query maps, and validated before they reach the store.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Which baseline lines a query targets.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum ItemFilter {
    /// Every line of every estimate of a project.
    Project { project_id: String },
    /// Every line of one estimate.
    Estimate { estimate_id: String },
    /// Lines of one estimate under a WBS node (`node_id` is the node path).
    WbsScope { estimate_id: String, node_id: String },
}

impl ItemFilter {
    /// Reject empty identifiers.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` naming the first empty field.
    pub fn validate(&self) -> Result<(), CoreError> {
        let fields: Vec<(&str, &str)> = match self {
            Self::Project { project_id } => vec![("project_id", project_id.as_str())],
            Self::Estimate { estimate_id } => vec![("estimate_id", estimate_id.as_str())],
            Self::WbsScope {
                estimate_id,
                node_id,
            } => vec![
                ("estimate_id", estimate_id.as_str()),
                ("node_id", node_id.as_str()),
            ],
        };
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(CoreError::Validation(format!("{name} must not be empty")));
            }
        }
        Ok(())
    }

    /// WBS node path when the filter is scoped to a subtree.
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::WbsScope { node_id, .. } => Some(node_id),
            Self::Project { .. } | Self::Estimate { .. } => None,
        }
    }
}
