use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::facets::{Facet, FacetIndex, RowSet};
use crate::normalize::key_of;

/// Per-facet multi-select. Values are kept as the caller typed them; an
/// absent or empty entry means "no constraint on this facet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSelection {
    choices: BTreeMap<Facet, BTreeSet<String>>,
}

impl FilterSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with<I, S>(mut self, facet: Facet, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set(facet, values);
        self
    }

    pub fn set<I, S>(&mut self, facet: Facet, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices.insert(facet, values.into_iter().map(Into::into).collect());
    }

    pub fn select(&mut self, facet: Facet, value: impl Into<String>) {
        self.choices.entry(facet).or_default().insert(value.into());
    }

    pub fn values(&self, facet: Facet) -> Option<&BTreeSet<String>> {
        self.choices.get(&facet).filter(|v| !v.is_empty())
    }

    /// Facets that actually constrain the result.
    pub fn constrained(&self) -> impl Iterator<Item = (Facet, &BTreeSet<String>)> {
        self.choices.iter().filter(|(_, v)| !v.is_empty()).map(|(f, v)| (*f, v))
    }

    pub fn is_unconstrained(&self) -> bool {
        self.constrained().next().is_none()
    }
}

/// Rows matching `values` for one facet: the union of each value's postings.
/// Values the index has never seen contribute nothing.
fn facet_matches(index: &FacetIndex, facet: Facet, values: &BTreeSet<String>) -> RowSet {
    let mut matches = RowSet::new();
    for value in values {
        if let Some(rows) = index.rows(facet, &key_of(value)) {
            matches.extend(rows.iter().copied());
        }
    }
    matches
}

/// Union within a facet, intersection across facets. The result is always a
/// subset of `index.all_rows()`.
pub fn apply(index: &FacetIndex, selection: &FilterSelection) -> RowSet {
    let mut pool = index.all_rows();
    for (facet, values) in selection.constrained() {
        let matches = facet_matches(index, facet, values);
        pool.retain(|pos| matches.contains(pos));
        if pool.is_empty() {
            break;
        }
    }
    pool
}
