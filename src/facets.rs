use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::normalize::{NormalizedRow, key_of};

/// Positions into the row slice an index was built from.
pub type RowSet = BTreeSet<usize>;

/// Closed set of filterable dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Country,
    Region,
    Hub,
    Broker,
    Cedant,
    Insured,
    Year,
    ExtType,
    Class,
    Subclass,
}

impl Facet {
    pub const ALL: [Facet; 10] = [
        Facet::Country,
        Facet::Region,
        Facet::Hub,
        Facet::Broker,
        Facet::Cedant,
        Facet::Insured,
        Facet::Year,
        Facet::ExtType,
        Facet::Class,
        Facet::Subclass,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Facet::Country => "country",
            Facet::Region => "region",
            Facet::Hub => "hub",
            Facet::Broker => "broker",
            Facet::Cedant => "cedant",
            Facet::Insured => "insured",
            Facet::Year => "year",
            Facet::ExtType => "ext_type",
            Facet::Class => "class",
            Facet::Subclass => "subclass",
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Facet {
    type Err = EngineError;

    /// Accepts the snake_case name, with or without a trailing `[]` as sent
    /// by multi-select query strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = key_of(s);
        let name = name.strip_suffix("[]").unwrap_or(&name).replace('-', "_");
        Facet::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| EngineError::UnknownFacet(s.to_string()))
    }
}

/// Inverted index over one row slice: facet → lowercase value → rows.
#[derive(Debug, Clone, Default)]
pub struct FacetIndex {
    row_count: usize,
    dataset_version: u64,
    postings: HashMap<Facet, HashMap<String, RowSet>>,
    /// First trimmed spelling seen for each key.
    display: HashMap<Facet, HashMap<String, String>>,
    /// Class key → subclass keys seen alongside it.
    subclasses_by_class: HashMap<String, BTreeSet<String>>,
}

impl FacetIndex {
    /// Single pass over `rows`; rows with no key for a facet are skipped for
    /// that facet only.
    pub fn build(rows: &[NormalizedRow], dataset_version: u64) -> Self {
        let mut index = FacetIndex {
            row_count: rows.len(),
            dataset_version,
            ..Default::default()
        };
        for (pos, row) in rows.iter().enumerate() {
            for facet in Facet::ALL {
                let Some(key) = row.facet_key(facet) else { continue };
                let postings = index.postings.entry(facet).or_default();
                if let Some(set) = postings.get_mut(key) {
                    set.insert(pos);
                    continue;
                }
                postings.insert(key.to_string(), RowSet::from([pos]));
                if let Some(text) = row.facet_display(facet) {
                    index.display.entry(facet).or_default().insert(key.to_string(), text);
                }
            }
            if let (Some(class), Some(subclass)) = (&row.keys.class, &row.keys.subclass) {
                index
                    .subclasses_by_class
                    .entry(class.clone())
                    .or_default()
                    .insert(subclass.clone());
            }
        }
        index
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn dataset_version(&self) -> u64 {
        self.dataset_version
    }

    pub fn all_rows(&self) -> RowSet {
        (0..self.row_count).collect()
    }

    /// Rows holding `key` (already lowercased) for `facet`.
    pub fn rows(&self, facet: Facet, key: &str) -> Option<&RowSet> {
        self.postings.get(&facet)?.get(key)
    }

    /// Number of distinct values indexed for `facet`.
    pub fn cardinality(&self, facet: Facet) -> usize {
        self.postings.get(&facet).map_or(0, HashMap::len)
    }

    /// Selectable values for `facet` in their display spelling, sorted by key.
    pub fn options(&self, facet: Facet) -> Vec<String> {
        let Some(display) = self.display.get(&facet) else {
            return Vec::new();
        };
        let mut keys: Vec<&String> = display.keys().collect();
        keys.sort();
        keys.into_iter().map(|k| display[k].clone()).collect()
    }

    /// Subclass options narrowed to the chosen classes. No chosen class means
    /// every subclass. This is a presentation aid; filtering never uses it.
    pub fn subclass_options<S: AsRef<str>>(&self, classes: &[S]) -> Vec<String> {
        if classes.is_empty() {
            return self.options(Facet::Subclass);
        }
        let Some(display) = self.display.get(&Facet::Subclass) else {
            return Vec::new();
        };
        let keys: BTreeSet<&String> = classes
            .iter()
            .filter_map(|c| self.subclasses_by_class.get(&key_of(c.as_ref())))
            .flatten()
            .collect();
        keys.into_iter().filter_map(|k| display.get(k).cloned()).collect()
    }
}
