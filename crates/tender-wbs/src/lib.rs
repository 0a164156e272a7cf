//! # tender-wbs
//!
//! Work-Breakdown-Structure hierarchy for estimate lines.
//!
//! Pure, synchronous computations over in-memory collections:
//! - [`path`] turns the seven nullable level fields of a line into an ordered
//!   path, inserting a `(None)` placeholder for lines without a level 1.
//! - [`tree`] assembles the paths of many lines into one deduplicated,
//!   name-sorted tree keyed by path.
//! - [`filter`] narrows a line collection to the subtree of a selected node.

pub mod filter;
pub mod path;
pub mod tree;

pub use filter::{filter_by_node, filter_by_node_id, matches_node_id};
pub use path::{PLACEHOLDER_CODE, WbsLevel, WbsSource, build_path, path_key};
pub use tree::{WbsAssembly, WbsNode, WbsRecord, build_tree};
