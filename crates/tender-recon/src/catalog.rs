//! Read-only index over a baseline price list.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use tender_core::entities::PriceListItem;
use unicode_segmentation::UnicodeSegmentation;

/// Lower-cased Unicode words of a description.
#[must_use]
pub fn description_tokens(text: &str) -> BTreeSet<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

/// Jaccard overlap of two token sets, `0.0` when either is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn token_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count() as f64;
    let union = (a.len() + b.len()) as f64 - inter;
    if union > 0.0 { inter / union } else { 0.0 }
}

/// A catalog entry with its description similarity to a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredItem<'a> {
    pub item: &'a PriceListItem,
    pub score: f64,
}

/// Lookups over one estimate's price list.
///
/// Built once per reconciliation pass and never mutated afterwards.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    items: Vec<PriceListItem>,
    by_id: HashMap<String, usize>,
    by_code: HashMap<String, Vec<usize>>,
    by_token: HashMap<String, Vec<usize>>,
    tokens: Vec<BTreeSet<String>>,
}

impl CatalogIndex {
    #[must_use]
    pub fn build(items: Vec<PriceListItem>) -> Self {
        let mut by_id = HashMap::with_capacity(items.len());
        let mut by_code: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_token: HashMap<String, Vec<usize>> = HashMap::new();
        let mut tokens = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            by_id.insert(item.id.clone(), idx);
            by_code.entry(item.code.clone()).or_default().push(idx);
            let words = description_tokens(&item.description);
            for word in &words {
                by_token.entry(word.clone()).or_default().push(idx);
            }
            tokens.push(words);
        }

        tracing::debug!(
            items = items.len(),
            codes = by_code.len(),
            tokens = by_token.len(),
            "built price catalog index"
        );

        Self {
            items,
            by_id,
            by_code,
            by_token,
            tokens,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn items(&self) -> &[PriceListItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&PriceListItem> {
        self.by_id.get(id).map(|&idx| &self.items[idx])
    }

    /// Entries whose code equals `code` exactly.
    #[must_use]
    pub fn by_code(&self, code: &str) -> Vec<&PriceListItem> {
        self.by_code
            .get(code)
            .map(|hits| hits.iter().map(|&idx| &self.items[idx]).collect())
            .unwrap_or_default()
    }

    /// Entries whose description contains the (lower-cased) token.
    #[must_use]
    pub fn by_token(&self, token: &str) -> Vec<&PriceListItem> {
        self.by_token
            .get(&token.to_lowercase())
            .map(|hits| hits.iter().map(|&idx| &self.items[idx]).collect())
            .unwrap_or_default()
    }

    /// Rank the given entries by description similarity, best first.
    ///
    /// No threshold applies: every entry is returned.
    #[must_use]
    pub fn rank<'a>(&'a self, entries: &[&'a PriceListItem], description: &str) -> Vec<ScoredItem<'a>> {
        let query = description_tokens(description);
        let mut scored: Vec<ScoredItem<'a>> = entries
            .iter()
            .map(|&item| ScoredItem {
                item,
                score: self
                    .by_id
                    .get(&item.id)
                    .map_or(0.0, |&idx| token_overlap(&query, &self.tokens[idx])),
            })
            .collect();
        scored.sort_by(compare_scored);
        scored
    }

    /// Entries sharing at least one description token with `description`,
    /// scored by overlap, below-threshold entries dropped, best first.
    #[must_use]
    pub fn similar(&self, description: &str, min_similarity: f64) -> Vec<ScoredItem<'_>> {
        let query = description_tokens(description);
        let candidates: BTreeSet<usize> = query
            .iter()
            .filter_map(|word| self.by_token.get(word))
            .flatten()
            .copied()
            .collect();

        let mut scored: Vec<ScoredItem<'_>> = candidates
            .into_iter()
            .map(|idx| ScoredItem {
                item: &self.items[idx],
                score: token_overlap(&query, &self.tokens[idx]),
            })
            .filter(|s| s.score >= min_similarity)
            .collect();
        scored.sort_by(compare_scored);
        scored
    }
}

/// Score descending, then code and id ascending so ties are deterministic.
fn compare_scored(a: &ScoredItem<'_>, b: &ScoredItem<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.item.code.cmp(&b.item.code))
        .then_with(|| a.item.id.cmp(&b.item.id))
}
