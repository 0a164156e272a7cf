//! WBS path building.
//!
//! A path is recomputed from the line every time it is needed; nothing is
//! cached across mutations of the line.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tender_core::entities::{EstimateItem, WbsLevels};

/// Code and name of the synthetic level-1 parent of orphaned lines.
pub const PLACEHOLDER_CODE: &str = "(None)";

/// Separator between codes in a path key.
pub const PATH_SEPARATOR: char = '/';

/// Escape character for separators occurring inside a code.
pub const PATH_ESCAPE: char = '\\';

/// One rung of a hierarchy path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WbsLevel {
    pub code: String,
    pub name: Option<String>,
    pub level: u8,
}

impl WbsLevel {
    /// Display name, falling back to the code.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.code)
    }

    fn placeholder() -> Self {
        Self {
            code: PLACEHOLDER_CODE.to_string(),
            name: Some(PLACEHOLDER_CODE.to_string()),
            level: 1,
        }
    }
}

/// Anything exposing the seven WBS level fields.
pub trait WbsSource {
    /// Value at 1-based `level` (1..=7); `None` when unset.
    fn level_value(&self, level: u8) -> Option<&str>;
}

impl WbsSource for WbsLevels {
    fn level_value(&self, level: u8) -> Option<&str> {
        self.get(level)
    }
}

impl WbsSource for EstimateItem {
    fn level_value(&self, level: u8) -> Option<&str> {
        self.wbs.get(level)
    }
}

impl<T: WbsSource + ?Sized> WbsSource for &T {
    fn level_value(&self, level: u8) -> Option<&str> {
        (**self).level_value(level)
    }
}

/// Build the ordered hierarchy path of a line.
///
/// Levels are read 1 through 7 and every present value becomes a rung with
/// `code == name == value`. When level 1 is missing but a deeper level is
/// present, a `(None)` rung at level 1 is prepended so orphaned lines group
/// under one shared parent. A line with no level yields an empty path.
#[must_use]
pub fn build_path<T: WbsSource + ?Sized>(item: &T) -> Vec<WbsLevel> {
    let mut path: Vec<WbsLevel> = (1..=WbsLevels::MAX_LEVEL)
        .filter_map(|level| {
            item.level_value(level)
                .filter(|value| !value.is_empty())
                .map(|value| WbsLevel {
                    code: value.to_string(),
                    name: Some(value.to_string()),
                    level,
                })
        })
        .collect();

    if let Some(first) = path.first() {
        if first.level != 1 {
            path.insert(0, WbsLevel::placeholder());
        }
    }
    path
}

/// `/`-joined codes of a path.
///
/// A `/` or `\` inside a code is escaped with `\`, so a code `A/B` keys as
/// `A\/B` and never collides with the two-level path `A/B`.
#[must_use]
pub fn path_key(path: &[WbsLevel]) -> String {
    let mut key = String::new();
    for rung in path {
        push_segment(&mut key, &rung.code);
    }
    key
}

/// Append one escaped code to a path key, separator included.
pub(crate) fn push_segment(key: &mut String, code: &str) {
    if !key.is_empty() {
        key.push(PATH_SEPARATOR);
    }
    for ch in code.chars() {
        if ch == PATH_SEPARATOR || ch == PATH_ESCAPE {
            key.push(PATH_ESCAPE);
        }
        key.push(ch);
    }
}
