use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::facets::{FacetIndex, RowSet};
use crate::filter::{self, FilterSelection};
use crate::normalize::{NormalizedRow, normalize_all};
use crate::record::RawPolicyRecord;
use crate::roles::{RoleScope, apply_scope};

/// Where raw records come from. The stamp is compared between calls to
/// decide whether a reload is needed.
pub trait DatasetSource {
    fn stamp(&self) -> Result<SystemTime>;
    fn load(&self) -> Result<Vec<RawPolicyRecord>>;
}

/// One JSON record per line; blank lines are skipped.
#[derive(Debug, Clone)]
pub struct NdjsonSource {
    path: PathBuf,
}

impl NdjsonSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for NdjsonSource {
    fn stamp(&self) -> Result<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|e| EngineError::io(&self.path, e))
    }

    fn load(&self) -> Result<Vec<RawPolicyRecord>> {
        let text = fs::read_to_string(&self.path).map_err(|e| EngineError::io(&self.path, e))?;
        parse_ndjson(&text).map_err(|(line, source)| EngineError::Record {
            path: self.path.clone(),
            line,
            source,
        })
    }
}

/// Parse NDJSON text; on failure returns the 1-based line number.
pub fn parse_ndjson(text: &str) -> std::result::Result<Vec<RawPolicyRecord>, (usize, serde_json::Error)> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| serde_json::from_str(line).map_err(|e| (i + 1, e)))
        .collect()
}

// ── Views ───────────────────────────────────────────────────────────────────

/// Rows one caller may see together with the index built over exactly those
/// rows. Positions in the index refer to `rows()`.
#[derive(Debug)]
pub struct ScopedView {
    scope: RoleScope,
    rows: Vec<NormalizedRow>,
    index: FacetIndex,
}

impl ScopedView {
    pub fn build(rows: &[NormalizedRow], scope: RoleScope, dataset_version: u64) -> Self {
        let rows = apply_scope(rows, &scope);
        let index = FacetIndex::build(&rows, dataset_version);
        debug!(
            dataset_version,
            visible = rows.len(),
            ?scope,
            "built scoped view"
        );
        Self { scope, rows, index }
    }

    pub fn scope(&self) -> &RoleScope {
        &self.scope
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn index(&self) -> &FacetIndex {
        &self.index
    }

    pub fn filter(&self, selection: &FilterSelection) -> RowSet {
        filter::apply(&self.index, selection)
    }
}

/// One normalized load of a source. Views are derived lazily per scope and
/// live exactly as long as the dataset they came from.
#[derive(Debug)]
pub struct Dataset {
    version: u64,
    stamp: Option<SystemTime>,
    rows: Vec<NormalizedRow>,
    views: Mutex<HashMap<RoleScope, Arc<ScopedView>>>,
}

impl Dataset {
    pub fn from_records(version: u64, records: &[RawPolicyRecord]) -> Self {
        Self::from_rows(version, normalize_all(records))
    }

    pub fn from_rows(version: u64, rows: Vec<NormalizedRow>) -> Self {
        Self { version, stamp: None, rows, views: Mutex::new(HashMap::new()) }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn stamp(&self) -> Option<SystemTime> {
        self.stamp
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    /// Role-filtered rows and their index, built on first use per scope.
    pub fn view(&self, scope: &RoleScope) -> Arc<ScopedView> {
        let mut views = self.views.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(view) = views.get(scope) {
            return Arc::clone(view);
        }
        let view = Arc::new(ScopedView::build(&self.rows, scope.clone(), self.version));
        views.insert(scope.clone(), Arc::clone(&view));
        view
    }
}

// ── Cache ───────────────────────────────────────────────────────────────────

/// Single-slot cache over a [`DatasetSource`]. The slot is replaced whenever
/// the source stamp differs from the cached one or after [`invalidate`].
///
/// [`invalidate`]: DatasetCache::invalidate
#[derive(Debug)]
pub struct DatasetCache<S> {
    source: S,
    slot: Option<Arc<Dataset>>,
    loads: u64,
}

impl<S: DatasetSource> DatasetCache<S> {
    pub fn new(source: S) -> Self {
        Self { source, slot: None, loads: 0 }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Current dataset, reloading first if the source changed.
    pub fn get(&mut self) -> Result<Arc<Dataset>> {
        let stamp = self.source.stamp()?;
        if let Some(current) = &self.slot {
            if current.stamp == Some(stamp) {
                return Ok(Arc::clone(current));
            }
        }
        let records = self.source.load()?;
        self.loads += 1;
        let mut dataset = Dataset::from_records(self.loads, &records);
        dataset.stamp = Some(stamp);
        info!(version = dataset.version, rows = dataset.rows.len(), "dataset loaded");
        let dataset = Arc::new(dataset);
        self.slot = Some(Arc::clone(&dataset));
        Ok(dataset)
    }

    /// The cached dataset without checking the source.
    pub fn peek(&self) -> Option<Arc<Dataset>> {
        self.slot.clone()
    }

    /// Drop the slot so the next [`get`](Self::get) reloads unconditionally.
    pub fn invalidate(&mut self) {
        if self.slot.take().is_some() {
            debug!("dataset cache invalidated");
        }
    }

    /// Number of reloads performed so far; also the newest dataset version.
    pub fn loads(&self) -> u64 {
        self.loads
    }
}
