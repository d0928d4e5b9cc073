use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::facets::{Facet, RowSet};
use crate::normalize::NormalizedRow;
use crate::time::{Quarter, TimeBucketer};

/// Running sums over a row subset.
#[derive(Debug, Clone, Copy, Default)]
struct Totals {
    premium: f64,
    acquisition: f64,
    paid_claims: f64,
    outstanding_claims: f64,
    max_liability: f64,
    rows: usize,
}

impl Totals {
    fn add(&mut self, row: &NormalizedRow) {
        self.premium += row.premium;
        self.acquisition += row.acquisition;
        self.paid_claims += row.paid_claims;
        self.outstanding_claims += row.outstanding_claims;
        self.max_liability += row.max_liability;
        self.rows += 1;
    }
}

/// Headline figures for a row subset. All percentages are 0 when there is
/// no premium.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub premium: f64,
    pub acquisition: f64,
    pub paid_claims: f64,
    pub outstanding_claims: f64,
    /// Paid plus outstanding.
    pub incurred_claims: f64,
    /// Premium less incurred claims less acquisition.
    pub technical_result: f64,
    pub loss_ratio_pct: f64,
    pub acquisition_pct: f64,
    /// Always `loss_ratio_pct + acquisition_pct`.
    pub combined_ratio_pct: f64,
    pub number_of_accounts: usize,
    pub avg_max_liability: f64,
}

impl KpiSnapshot {
    fn from_totals(t: Totals) -> Self {
        let incurred_claims = t.paid_claims + t.outstanding_claims;
        let loss_ratio_pct = pct(incurred_claims, t.premium);
        let acquisition_pct = pct(t.acquisition, t.premium);
        KpiSnapshot {
            premium: t.premium,
            acquisition: t.acquisition,
            paid_claims: t.paid_claims,
            outstanding_claims: t.outstanding_claims,
            incurred_claims,
            technical_result: t.premium - incurred_claims - t.acquisition,
            loss_ratio_pct,
            acquisition_pct,
            combined_ratio_pct: loss_ratio_pct + acquisition_pct,
            number_of_accounts: t.rows,
            avg_max_liability: if t.rows > 0 { t.max_liability / t.rows as f64 } else { 0.0 },
        }
    }
}

/// `part / whole × 100`, or 0 when `whole` is not positive.
fn pct(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

pub fn aggregate<'a, I>(rows: I) -> KpiSnapshot
where
    I: IntoIterator<Item = &'a NormalizedRow>,
{
    let mut totals = Totals::default();
    for row in rows {
        totals.add(row);
    }
    KpiSnapshot::from_totals(totals)
}

/// Rows of `rows` named by `subset`. Positions past the end are ignored.
pub fn select<'a>(rows: &'a [NormalizedRow], subset: &'a RowSet) -> impl Iterator<Item = &'a NormalizedRow> {
    subset.iter().filter_map(move |&i| rows.get(i))
}

pub fn aggregate_subset(rows: &[NormalizedRow], subset: &RowSet) -> KpiSnapshot {
    aggregate(select(rows, subset))
}

// ── Period rollups ──────────────────────────────────────────────────────────

fn rollup<'a, K, I, F>(rows: I, bucket: F) -> BTreeMap<K, KpiSnapshot>
where
    K: Ord,
    I: IntoIterator<Item = &'a NormalizedRow>,
    F: Fn(&NormalizedRow) -> Option<K>,
{
    let mut totals: BTreeMap<K, Totals> = BTreeMap::new();
    for row in rows {
        if let Some(k) = bucket(row) {
            totals.entry(k).or_default().add(row);
        }
    }
    totals.into_iter().map(|(k, t)| (k, KpiSnapshot::from_totals(t))).collect()
}

/// KPIs per resolved year. Rows without a year in the bucketer's window are
/// left out.
pub fn rollup_by_year<'a, I>(rows: I, bucketer: &TimeBucketer) -> BTreeMap<i32, KpiSnapshot>
where
    I: IntoIterator<Item = &'a NormalizedRow>,
{
    rollup(rows, |r| bucketer.resolve_year(r))
}

pub fn rollup_by_quarter<'a, I>(rows: I, bucketer: &TimeBucketer) -> BTreeMap<Quarter, KpiSnapshot>
where
    I: IntoIterator<Item = &'a NormalizedRow>,
{
    rollup(rows, |r| bucketer.resolve_quarter(r))
}

pub fn rollup_by_month<'a, I>(rows: I, bucketer: &TimeBucketer) -> BTreeMap<u32, KpiSnapshot>
where
    I: IntoIterator<Item = &'a NormalizedRow>,
{
    rollup(rows, |r| bucketer.resolve_month(r))
}

// ── Facet breakdown ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetBreakdown {
    pub value: String,
    pub kpi: KpiSnapshot,
}

/// KPIs per value of `facet`, largest premium first, at most `limit` entries.
/// Rows with no value for the facet are skipped.
pub fn breakdown<'a, I>(rows: I, facet: Facet, limit: usize) -> Vec<FacetBreakdown>
where
    I: IntoIterator<Item = &'a NormalizedRow>,
{
    let mut groups: HashMap<&str, (String, Totals)> = HashMap::new();
    for row in rows {
        let Some(key) = row.facet_key(facet) else { continue };
        let (_, totals) = groups
            .entry(key)
            .or_insert_with(|| (row.facet_display(facet).unwrap_or_default(), Totals::default()));
        totals.add(row);
    }
    let mut out: Vec<FacetBreakdown> = groups
        .into_values()
        .map(|(value, t)| FacetBreakdown { value, kpi: KpiSnapshot::from_totals(t) })
        .collect();
    out.sort_by(|a, b| {
        b.kpi
            .premium
            .partial_cmp(&a.kpi.premium)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.value.cmp(&b.value))
    });
    out.truncate(limit);
    out
}
