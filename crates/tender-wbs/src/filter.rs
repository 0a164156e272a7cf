//! Subtree filtering of lines.
//!
//! A line belongs to a node when the node id equals the key of one of the
//! prefixes of the line's path. Selecting a node therefore selects every
//! line at or below it.

use crate::path::{WbsSource, build_path, push_segment};
use crate::tree::WbsNode;

/// Whether `item` lies at or below the node with path key `node_id`.
#[must_use]
pub fn matches_node_id<T: WbsSource + ?Sized>(item: &T, node_id: &str) -> bool {
    let mut key = String::new();
    for rung in &build_path(item) {
        push_segment(&mut key, &rung.code);
        if key == node_id {
            return true;
        }
        if !node_id.starts_with(key.as_str()) {
            return false;
        }
    }
    false
}

/// Lines under `node`. `None` returns every line unchanged.
pub fn filter_by_node<'a, T: WbsSource>(items: &'a [T], node: Option<&WbsNode>) -> Vec<&'a T> {
    filter_by_node_id(items, node.map(|n| n.id.as_str()))
}

/// Lines under the node with path key `node_id`. `None` returns every line.
pub fn filter_by_node_id<'a, T: WbsSource>(items: &'a [T], node_id: Option<&str>) -> Vec<&'a T> {
    match node_id {
        None => items.iter().collect(),
        Some(node_id) => items
            .iter()
            .filter(|item| matches_node_id(*item, node_id))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{build_tree, find_node};
    use pretty_assertions::assert_eq;
    use tender_core::entities::WbsLevels;

    fn item(values: &[Option<&str>]) -> WbsLevels {
        WbsLevels::from_values(values)
    }

    fn sample() -> Vec<WbsLevels> {
        vec![
            item(&[Some("1"), Some("1.1")]),
            item(&[Some("1"), Some("1.2")]),
            item(&[None, Some("2.1")]),
            item(&[Some("10"), Some("10.1")]),
        ]
    }

    #[test]
    fn selecting_root_returns_whole_subtree() {
        let items = sample();
        let selected = filter_by_node_id(&items, Some("1"));
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|i| i.get(1) == Some("1")));
    }

    #[test]
    fn selecting_leaf_returns_its_lines() {
        let items = sample();
        let selected = filter_by_node_id(&items, Some("1/1.2"));
        assert_eq!(selected, vec![&items[1]]);
    }

    #[test]
    fn placeholder_root_selects_orphans() {
        let items = sample();
        let selected = filter_by_node_id(&items, Some("(None)"));
        assert_eq!(selected, vec![&items[2]]);
    }

    #[test]
    fn textual_prefix_is_not_a_path_prefix() {
        // "10" starts with "1" but is a different root.
        let items = sample();
        assert!(!matches_node_id(&items[3], "1"));
        assert!(matches_node_id(&items[3], "10"));
    }

    #[test]
    fn escaped_code_selects_only_its_own_line() {
        let items = vec![item(&[Some("A/B")]), item(&[Some("A"), Some("B")])];
        assert_eq!(filter_by_node_id(&items, Some(r"A\/B")), vec![&items[0]]);
        assert_eq!(filter_by_node_id(&items, Some("A/B")), vec![&items[1]]);
        assert_eq!(filter_by_node_id(&items, Some("A")), vec![&items[1]]);
    }

    #[test]
    fn no_node_is_identity() {
        let items = sample();
        assert_eq!(filter_by_node(&items, None).len(), items.len());
        assert_eq!(filter_by_node_id(&items, None).len(), items.len());
    }

    #[test]
    fn unknown_node_selects_nothing() {
        let items = sample();
        assert!(filter_by_node_id(&items, Some("9")).is_empty());
    }

    #[test]
    fn every_tree_node_selects_its_leaf_lines() {
        let items = sample();
        let tree = build_tree(&items);
        for root in &tree {
            let by_node = filter_by_node(&items, Some(root));
            assert!(!by_node.is_empty(), "root {} selected nothing", root.id);
            for child in &root.children {
                let below = filter_by_node(&items, Some(child));
                assert!(below.iter().all(|line| by_node.contains(line)));
            }
        }
        let node = find_node(&tree, "(None)/2.1").unwrap();
        assert_eq!(filter_by_node(&items, Some(node)), vec![&items[2]]);
    }

    #[test]
    fn lines_without_levels_never_match() {
        let items = vec![item(&[])];
        assert!(filter_by_node_id(&items, Some("(None)")).is_empty());
    }
}
