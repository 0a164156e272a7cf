//! WBS tree assembly.
//!
//! Nodes are keyed by their path key (`/`-joined escaped codes). Two lines that share
//! a code prefix share the ancestor nodes of that prefix; identity comes from
//! the key, never from the source lines.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::path::{WbsSource, build_path, push_segment};

/// Longest code shown on a node before it is ellipsized.
pub const DISPLAY_CODE_MAX: usize = 25;

/// A node of the assembled tree. Field names are the public output shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WbsNode {
    pub id: String,
    pub code: String,
    pub name: String,
    pub level: u8,
    pub children: Vec<WbsNode>,
}

impl WbsNode {
    /// Depth-first lookup of `id` in this subtree.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&Self> {
        if self.id == id {
            return Some(self);
        }
        find_node(&self.children, id)
    }

    /// Number of nodes in this subtree, itself included.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Self::count).sum::<usize>()
    }
}

/// Lookup of a node id across a forest.
#[must_use]
pub fn find_node<'a>(roots: &'a [WbsNode], id: &str) -> Option<&'a WbsNode> {
    roots.iter().find_map(|root| root.find(id))
}

/// Flattened view of one node, used to persist the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WbsRecord {
    pub path: String,
    /// Full code, never ellipsized.
    pub code: String,
    pub name: String,
    pub level: u8,
    pub parent_path: Option<String>,
    /// Index among the sorted siblings.
    pub position: u32,
}

#[derive(Debug)]
struct Draft {
    code: String,
    name: String,
    level: u8,
    parent: Option<String>,
    children: BTreeSet<String>,
}

/// Incremental tree builder.
///
/// Each distinct path prefix creates exactly one node; attaching a child is
/// idempotent. Ordering is applied when the tree is read, so the result does
/// not depend on the order lines were added.
#[derive(Debug, Default)]
pub struct WbsAssembly {
    nodes: HashMap<String, Draft>,
    roots: BTreeSet<String>,
}

impl WbsAssembly {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble every line of a collection.
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: WbsSource,
    {
        let mut assembly = Self::new();
        for item in items {
            assembly.add(&item);
        }
        assembly
    }

    /// Add one line. Returns the depth of its path (0 when excluded).
    pub fn add<T: WbsSource + ?Sized>(&mut self, item: &T) -> usize {
        let path = build_path(item);
        let mut key = String::new();
        let mut parent: Option<String> = None;

        for rung in &path {
            push_segment(&mut key, &rung.code);

            let draft = self.nodes.entry(key.clone()).or_insert_with(|| Draft {
                code: rung.code.clone(),
                name: rung.display_name().to_string(),
                level: rung.level,
                parent: parent.clone(),
                children: BTreeSet::new(),
            });
            // The same key can be reached through different level numbers
            // (`1/X` at level 2 or 3); the shallowest wins.
            draft.level = draft.level.min(rung.level);

            match &parent {
                Some(parent_key) => {
                    if let Some(parent_draft) = self.nodes.get_mut(parent_key) {
                        parent_draft.children.insert(key.clone());
                    }
                }
                None => {
                    self.roots.insert(key.clone());
                }
            }
            parent = Some(key.clone());
        }
        path.len()
    }

    /// Number of distinct nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Materialize the sorted forest.
    #[must_use]
    pub fn tree(&self) -> Vec<WbsNode> {
        self.sorted(&self.roots)
            .into_iter()
            .map(|key| self.materialize(key))
            .collect()
    }

    /// Pre-order flattened records with sibling positions.
    #[must_use]
    pub fn records(&self) -> Vec<WbsRecord> {
        let mut out = Vec::with_capacity(self.nodes.len());
        for (position, key) in self.sorted(&self.roots).into_iter().enumerate() {
            self.push_records(key, position, &mut out);
        }
        out
    }

    fn push_records(&self, key: &str, position: usize, out: &mut Vec<WbsRecord>) {
        let Some(draft) = self.nodes.get(key) else {
            return;
        };
        out.push(WbsRecord {
            path: key.to_string(),
            code: draft.code.clone(),
            name: draft.name.clone(),
            level: draft.level,
            parent_path: draft.parent.clone(),
            position: u32::try_from(position).unwrap_or(u32::MAX),
        });
        for (child_pos, child) in self.sorted(&draft.children).into_iter().enumerate() {
            self.push_records(child, child_pos, out);
        }
    }

    fn materialize(&self, key: &str) -> WbsNode {
        let draft = &self.nodes[key];
        WbsNode {
            id: key.to_string(),
            code: display_code(&draft.code),
            name: draft.name.clone(),
            level: draft.level,
            children: self
                .sorted(&draft.children)
                .into_iter()
                .map(|child| self.materialize(child))
                .collect(),
        }
    }

    fn sorted<'a>(&'a self, keys: &'a BTreeSet<String>) -> Vec<&'a str> {
        let mut keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        keys.sort_by(|a, b| {
            let name_a = self.nodes.get(*a).map_or("", |d| d.name.as_str());
            let name_b = self.nodes.get(*b).map_or("", |d| d.name.as_str());
            compare_names(name_a, name_b).then_with(|| a.cmp(b))
        });
        keys
    }
}

/// Build the sorted WBS forest of a line collection.
///
/// Lines with an empty path are left out. Re-running on the same lines, in
/// any order, yields an identical forest.
pub fn build_tree<I>(items: I) -> Vec<WbsNode>
where
    I: IntoIterator,
    I::Item: WbsSource,
{
    let assembly = WbsAssembly::from_items(items);
    tracing::trace!(nodes = assembly.len(), "assembled WBS tree");
    assembly.tree()
}

/// Collation used for sibling order: case-insensitive first, exact as tie-break.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Ellipsize a code longer than [`DISPLAY_CODE_MAX`] characters.
#[must_use]
pub fn display_code(code: &str) -> String {
    if code.chars().count() <= DISPLAY_CODE_MAX {
        return code.to_string();
    }
    let mut short: String = code.chars().take(DISPLAY_CODE_MAX - 1).collect();
    short.push('…');
    short
}
