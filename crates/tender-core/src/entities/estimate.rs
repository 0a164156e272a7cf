use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A baseline estimate (computo) of a project.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Estimate {
    pub id: String,
    pub project_id: String,
    pub name: String,
    /// At most one estimate per project is the baseline offers are compared with.
    pub is_baseline: bool,
    pub price_list_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The seven nullable WBS classification fields carried by a line.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct WbsLevels {
    pub level_1: Option<String>,
    pub level_2: Option<String>,
    pub level_3: Option<String>,
    pub level_4: Option<String>,
    pub level_5: Option<String>,
    pub level_6: Option<String>,
    pub level_7: Option<String>,
}

impl WbsLevels {
    /// Deepest supported WBS level.
    pub const MAX_LEVEL: u8 = 7;

    /// Value at 1-based `level`, `None` when unset, empty, or out of range.
    #[must_use]
    pub fn get(&self, level: u8) -> Option<&str> {
        let value = match level {
            1 => self.level_1.as_deref(),
            2 => self.level_2.as_deref(),
            3 => self.level_3.as_deref(),
            4 => self.level_4.as_deref(),
            5 => self.level_5.as_deref(),
            6 => self.level_6.as_deref(),
            7 => self.level_7.as_deref(),
            _ => None,
        };
        value.filter(|v| !v.is_empty())
    }

    /// Build from positional values; extra entries beyond level 7 are ignored.
    #[must_use]
    pub fn from_values<S: AsRef<str>>(values: &[Option<S>]) -> Self {
        let at = |idx: usize| {
            values
                .get(idx)
                .and_then(|v| v.as_ref().map(|s| s.as_ref().to_string()))
        };
        Self {
            level_1: at(0),
            level_2: at(1),
            level_3: at(2),
            level_4: at(3),
            level_5: at(4),
            level_6: at(5),
            level_7: at(6),
        }
    }

    /// All seven values in level order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Option<String>> {
        (1..=Self::MAX_LEVEL)
            .map(|level| self.get(level).map(String::from))
            .collect()
    }
}

/// A baseline estimate line.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct EstimateItem {
    pub id: String,
    pub project_id: String,
    pub estimate_id: String,
    pub price_list_item_id: Option<String>,
    pub progressive: Option<i64>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub amount: f64,
    #[serde(flatten)]
    pub wbs: WbsLevels,
    pub created_at: DateTime<Utc>,
}
