use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A persisted WBS node row of an estimate.
///
/// `path` is the `/`-joined code sequence that identifies the node inside its
/// estimate; `parent_path` is `None` for roots. `position` is the node's index
/// among its sorted siblings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct WbsNodeRecord {
    pub id: String,
    pub estimate_id: String,
    pub path: String,
    pub code: String,
    pub name: String,
    pub level: u8,
    pub parent_path: Option<String>,
    pub position: u32,
}
