use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cache::Dataset;
use crate::config::EngineConfig;
use crate::facets::{Facet, RowSet};
use crate::filter::FilterSelection;
use crate::kpi::{self, FacetBreakdown, KpiSnapshot};
use crate::normalize::NormalizedRow;
use crate::request::{Generation, RequestGate};
use crate::roles;
use crate::time::{PeriodFilter, Quarter, TimeBucketer, YearWindow};

/// Everything a caller sends for one dashboard refresh.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardQuery {
    pub roles: Vec<String>,
    pub selection: FilterSelection,
    pub period: PeriodFilter,
    /// Overrides the configured report window for year rollups.
    pub window: Option<YearWindow>,
    /// Facets to break KPIs down by, e.g. top brokers.
    pub breakdowns: Vec<Facet>,
}

/// Result of one refresh, ready for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub dataset_version: u64,
    /// Rows visible to the caller before any filter.
    pub visible_rows: usize,
    /// Rows left after facet and period filters.
    pub matched_rows: usize,
    pub kpi: KpiSnapshot,
    pub by_year: BTreeMap<i32, KpiSnapshot>,
    pub by_quarter: BTreeMap<Quarter, KpiSnapshot>,
    pub by_month: BTreeMap<u32, KpiSnapshot>,
    pub breakdowns: BTreeMap<Facet, Vec<FacetBreakdown>>,
    /// Selectable values per facet, from the caller's visible rows.
    pub options: BTreeMap<Facet, Vec<String>>,
    /// Subclass options narrowed by the selected classes.
    pub subclass_options: Vec<String>,
}

/// Scope, filter, bucket and aggregate `dataset` for one query. Also returns
/// the matched rows so callers can list them.
pub fn run_query(dataset: &Dataset, config: &EngineConfig, query: &DashboardQuery) -> (DashboardView, Vec<NormalizedRow>) {
    let scope = roles::scope(&query.roles, &config.roles);
    let view = dataset.view(&scope);
    let rows = view.rows();

    let bucketer = TimeBucketer::new(query.window.unwrap_or(config.report_window));
    let mut matched: RowSet = view.filter(&query.selection);
    if !query.period.is_unconstrained() {
        matched.retain(|&i| rows.get(i).is_some_and(|r| query.period.matches(&bucketer, r)));
    }
    debug!(
        dataset_version = dataset.version(),
        visible = rows.len(),
        matched = matched.len(),
        "dashboard query"
    );

    let subset: Vec<&NormalizedRow> = kpi::select(rows, &matched).collect();
    let breakdowns = query
        .breakdowns
        .iter()
        .map(|&f| (f, kpi::breakdown(subset.iter().copied(), f, config.breakdown_limit)))
        .collect();
    let options = Facet::ALL
        .into_iter()
        .map(|f| (f, view.index().options(f)))
        .collect();
    let chosen_classes: Vec<&String> = query
        .selection
        .values(Facet::Class)
        .map(|v| v.iter().collect())
        .unwrap_or_default();

    let result = DashboardView {
        dataset_version: dataset.version(),
        visible_rows: rows.len(),
        matched_rows: matched.len(),
        kpi: kpi::aggregate(subset.iter().copied()),
        by_year: kpi::rollup_by_year(subset.iter().copied(), &bucketer),
        by_quarter: kpi::rollup_by_quarter(subset.iter().copied(), &bucketer),
        by_month: kpi::rollup_by_month(subset.iter().copied(), &bucketer),
        breakdowns,
        options,
        subclass_options: view.index().subclass_options(&chosen_classes),
    };
    let listed = subset.into_iter().cloned().collect();
    (result, listed)
}

pub fn build_view(dataset: &Dataset, config: &EngineConfig, query: &DashboardQuery) -> DashboardView {
    run_query(dataset, config, query).0
}

/// Run `query` under a generation from `gate`; the view is published only if
/// no newer refresh started meanwhile.
pub fn refresh(
    gate: &RequestGate<DashboardView>,
    dataset: &Dataset,
    config: &EngineConfig,
    query: &DashboardQuery,
) -> (Generation, bool) {
    let generation = gate.begin();
    let view = build_view(dataset, config, query);
    let published = gate.publish(generation, view);
    (generation, published)
}
