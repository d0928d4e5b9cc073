use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::normalize::NormalizedRow;

/// Inclusive range of years a resolver accepts. Reports disagree on the lower
/// bound, so the bound travels with the caller instead of living in the code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct YearWindow {
    pub min: i32,
    pub max: i32,
}

impl YearWindow {
    /// Used by the normalizer and the year facet.
    pub const HISTORICAL: YearWindow = YearWindow { min: 1900, max: 2100 };
    /// Used by period reports that only cover the current book.
    pub const REPORTING: YearWindow = YearWindow { min: 2019, max: 2100 };

    pub fn contains(&self, year: i64) -> bool {
        year >= self.min as i64 && year <= self.max as i64
    }
}

impl Default for YearWindow {
    fn default() -> Self {
        Self::HISTORICAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub fn from_number(n: i64) -> Option<Self> {
        match n {
            1 => Some(Quarter::Q1),
            2 => Some(Quarter::Q2),
            3 => Some(Quarter::Q3),
            4 => Some(Quarter::Q4),
            _ => None,
        }
    }

    /// 1–3 → Q1, 4–6 → Q2, 7–9 → Q3, 10–12 → Q4.
    pub fn from_month(month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Self::from_number(((month - 1) / 3 + 1) as i64)
        } else {
            None
        }
    }

    pub fn number(self) -> u32 {
        self as u32 + 1
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

impl FromStr for Quarter {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = s.trim();
        let digits = t.strip_prefix(['Q', 'q']).unwrap_or(t);
        digits
            .parse::<i64>()
            .ok()
            .and_then(Quarter::from_number)
            .ok_or_else(|| EngineError::InvalidArgument(format!("not a quarter: {s}")))
    }
}

/// Fixed month table; index + 1 is the month number.
pub const MONTH_NAMES: [&str; 12] =
    ["JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC"];

const MONTH_FULL_NAMES: [&str; 12] = [
    "JANUARY", "FEBRUARY", "MARCH", "APRIL", "MAY", "JUNE", "JULY", "AUGUST", "SEPTEMBER", "OCTOBER",
    "NOVEMBER", "DECEMBER",
];

/// `"APR"`, `"apr"` and `"April"` all map to 4. Only whole names match, so
/// `"Marine"` is not March.
pub fn month_from_name(name: &str) -> Option<u32> {
    let upper = name.trim().to_ascii_uppercase();
    if upper == "SEPT" {
        return Some(9);
    }
    MONTH_NAMES
        .iter()
        .zip(MONTH_FULL_NAMES)
        .position(|(abbr, full)| upper == *abbr || upper == full)
        .map(|i| i as u32 + 1)
}

pub fn month_name(month: u32) -> Option<&'static str> {
    MONTH_NAMES.get((month as usize).checked_sub(1)?).copied()
}

static YEAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(19|20)\d{2}").expect("year pattern is valid"));

/// Year precedence chain shared by the normalizer and the bucketer:
/// the whole underwriting-year code as an integer, then the first 19xx/20xx
/// substring of the code, then the explicit inception year. Each candidate
/// must fall inside `window`.
pub fn resolve_year(uy_code: &str, inception_year: Option<i64>, window: YearWindow) -> Option<i32> {
    let code = uy_code.trim();
    if let Ok(y) = code.parse::<i64>() {
        if window.contains(y) {
            return Some(y as i32);
        }
    }
    if let Some(m) = YEAR_PATTERN.find(code) {
        if let Ok(y) = m.as_str().parse::<i64>() {
            if window.contains(y) {
                return Some(y as i32);
            }
        }
    }
    inception_year.filter(|y| window.contains(*y)).map(|y| y as i32)
}

const DATETIME_FORMATS: [&str; 4] =
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Slashed dates are read day-first; month-first is tried only when day-first
/// cannot be a date (`04/15/2021`).
const DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%b-%Y", "%d %b %Y", "%d-%b-%y", "%b %d, %Y", "%Y/%m/%d",
];

fn parse_full_date(t: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Some(dt.date_naive());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(t, f).ok().map(|dt| dt.date()))
        .or_else(|| DATE_FORMATS.iter().find_map(|f| NaiveDate::parse_from_str(t, f).ok()))
}

/// Year and month of a legacy free-text inception date. Timestamps and full
/// dates go through chrono; a bare `APR-2021` / `Apr 2021` falls back to the
/// month table.
pub fn parse_legacy_date(text: &str) -> Option<(i32, u32)> {
    let t = text.trim();
    if t.is_empty() {
        return None;
    }
    if let Some(d) = parse_full_date(t) {
        if YearWindow::HISTORICAL.contains(d.year() as i64) {
            return Some((d.year(), d.month()));
        }
    }
    let mut month = None;
    let mut year = None;
    for token in t.split(|c: char| c == '-' || c == '/' || c == ' ' || c == ',') {
        if token.is_empty() {
            continue;
        }
        if let Some(m) = month_from_name(token) {
            month.get_or_insert(m);
        } else if token.len() == 4 {
            if let Ok(y) = token.parse::<i64>() {
                if YearWindow::HISTORICAL.contains(y) {
                    year.get_or_insert(y as i32);
                }
            }
        }
    }
    Some((year?, month?))
}

/// Calendar placement of one row. Any part may be unresolved; nothing is
/// guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeBucket {
    pub year: Option<i32>,
    pub quarter: Option<Quarter>,
    pub month: Option<u32>,
}

/// Derives year/quarter/month for rows from their fallback chain of
/// date-ish fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBucketer {
    window: YearWindow,
}

impl TimeBucketer {
    pub fn new(window: YearWindow) -> Self {
        Self { window }
    }

    pub fn resolve_year(&self, row: &NormalizedRow) -> Option<i32> {
        resolve_year(&row.uy, row.inception_year, self.window)
    }

    /// Explicit quarter, then the explicit inception month, then the legacy
    /// date string.
    pub fn resolve_quarter(&self, row: &NormalizedRow) -> Option<Quarter> {
        if let Some(q) = row.inception_quarter.and_then(Quarter::from_number) {
            return Some(q);
        }
        if let Some(q) = explicit_month(row).and_then(Quarter::from_month) {
            return Some(q);
        }
        legacy_month(row).and_then(Quarter::from_month)
    }

    pub fn resolve_month(&self, row: &NormalizedRow) -> Option<u32> {
        explicit_month(row).or_else(|| legacy_month(row))
    }

    pub fn bucket(&self, row: &NormalizedRow) -> TimeBucket {
        TimeBucket {
            year: self.resolve_year(row),
            quarter: self.resolve_quarter(row),
            month: self.resolve_month(row),
        }
    }
}

impl Default for TimeBucketer {
    fn default() -> Self {
        Self::new(YearWindow::HISTORICAL)
    }
}

fn explicit_month(row: &NormalizedRow) -> Option<u32> {
    row.inception_month
        .filter(|m| (1..=12).contains(m))
        .map(|m| m as u32)
}

fn legacy_month(row: &NormalizedRow) -> Option<u32> {
    row.inception_date
        .as_deref()
        .and_then(parse_legacy_date)
        .map(|(_, m)| m)
}

/// Optional calendar constraint applied after facet filtering. A row with an
/// unresolved quarter or month only fails the constraint that needs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodFilter {
    pub quarter: Option<Quarter>,
    pub month: Option<u32>,
}

impl PeriodFilter {
    pub fn is_unconstrained(&self) -> bool {
        self.quarter.is_none() && self.month.is_none()
    }

    pub fn matches(&self, bucketer: &TimeBucketer, row: &NormalizedRow) -> bool {
        if let Some(q) = self.quarter {
            if bucketer.resolve_quarter(row) != Some(q) {
                return false;
            }
        }
        if let Some(m) = self.month {
            if bucketer.resolve_month(row) != Some(m) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> NormalizedRow {
        NormalizedRow::default()
    }

    // ── Year ──────────────────────────────────────────────────────────────────

    #[test]
    fn plain_code_resolves_directly() {
        assert_eq!(resolve_year("2020", None, YearWindow::HISTORICAL), Some(2020));
    }

    #[test]
    fn first_embedded_year_wins() {
        assert_eq!(resolve_year("UY 2020-2021", None, YearWindow::HISTORICAL), Some(2020));
    }

    #[test]
    fn unusable_code_falls_back_to_inception_year() {
        assert_eq!(resolve_year("N/A", Some(2021), YearWindow::HISTORICAL), Some(2021));
    }

    #[test]
    fn nothing_usable_leaves_year_unresolved() {
        assert_eq!(resolve_year("", None, YearWindow::HISTORICAL), None);
        assert_eq!(resolve_year("N/A", Some(1850), YearWindow::HISTORICAL), None);
    }

    #[test]
    fn reporting_window_rejects_years_the_historical_window_accepts() {
        assert_eq!(resolve_year("2015", None, YearWindow::HISTORICAL), Some(2015));
        assert_eq!(resolve_year("2015", None, YearWindow::REPORTING), None);
        assert_eq!(resolve_year("2015", Some(2020), YearWindow::REPORTING), Some(2020));
    }

    #[test]
    fn bucketer_year_uses_its_own_window() {
        let mut r = row();
        r.uy = "2018".into();
        assert_eq!(TimeBucketer::new(YearWindow::HISTORICAL).resolve_year(&r), Some(2018));
        assert_eq!(TimeBucketer::new(YearWindow::REPORTING).resolve_year(&r), None);
    }

    // ── Quarter ───────────────────────────────────────────────────────────────

    #[test]
    fn month_four_is_second_quarter() {
        let mut r = row();
        r.inception_month = Some(4);
        assert_eq!(TimeBucketer::default().resolve_quarter(&r), Some(Quarter::Q2));
    }

    #[test]
    fn explicit_quarter_overrides_month() {
        let mut r = row();
        r.inception_month = Some(4);
        r.inception_quarter = Some(3);
        assert_eq!(TimeBucketer::default().resolve_quarter(&r), Some(Quarter::Q3));
    }

    #[test]
    fn out_of_range_quarter_falls_through_to_month() {
        let mut r = row();
        r.inception_quarter = Some(7);
        r.inception_month = Some(11);
        assert_eq!(TimeBucketer::default().resolve_quarter(&r), Some(Quarter::Q4));
    }

    #[test]
    fn legacy_date_is_last_resort() {
        let mut r = row();
        r.inception_date = Some("15-AUG-2021".into());
        let b = TimeBucketer::default();
        assert_eq!(b.resolve_quarter(&r), Some(Quarter::Q3));
        assert_eq!(b.resolve_month(&r), Some(8));
    }

    #[test]
    fn unresolvable_row_stays_unbucketed() {
        let mut r = row();
        r.inception_date = Some("sometime".into());
        let bucket = TimeBucketer::default().bucket(&r);
        assert_eq!(bucket, TimeBucket { year: None, quarter: None, month: None });
    }

    // ── Legacy dates ──────────────────────────────────────────────────────────

    #[test]
    fn legacy_formats_parse() {
        assert_eq!(parse_legacy_date("2021-04-15"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("15/04/2021"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("15-Apr-2021"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("15 April 2021"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("APR-2021"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("Dec 2019"), Some((2019, 12)));
        assert_eq!(parse_legacy_date("Sept 2021"), Some((2021, 9)));
        assert_eq!(parse_legacy_date("2021"), None);
        assert_eq!(parse_legacy_date(""), None);
    }

    #[test]
    fn words_that_start_like_months_are_not_months() {
        assert_eq!(parse_legacy_date("Marine 2021"), None);
        assert_eq!(parse_legacy_date("Declined 2021"), None);
        assert_eq!(parse_legacy_date("Junk-2021"), None);
        assert_eq!(month_from_name("Augustus"), None);
        assert_eq!(month_from_name("ju"), None);
    }

    #[test]
    fn timestamps_resolve_to_their_date() {
        assert_eq!(parse_legacy_date("2021-04-15T00:00:00Z"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("2021-04-15T00:00:00.000Z"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("2021-04-15T08:30:00+04:00"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("2021-04-15 00:00:00"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("2021-04-15T10:20:30"), Some((2021, 4)));

        let mut r = row();
        r.inception_date = Some("2021-04-15T00:00:00Z".into());
        assert_eq!(TimeBucketer::default().resolve_quarter(&r), Some(Quarter::Q2));
    }

    #[test]
    fn slashed_dates_are_day_first_with_month_first_fallback() {
        assert_eq!(parse_legacy_date("03/11/2021"), Some((2021, 11)));
        assert_eq!(parse_legacy_date("04/15/2021"), Some((2021, 4)));
        assert_eq!(parse_legacy_date("31/31/2021"), None);
    }

    #[test]
    fn month_table_round_trips_names() {
        for (i, name) in MONTH_NAMES.iter().enumerate() {
            assert_eq!(month_from_name(name), Some(i as u32 + 1));
            assert_eq!(month_name(i as u32 + 1), Some(*name));
        }
        assert_eq!(month_from_name("september"), Some(9));
        assert_eq!(month_name(0), None);
        assert_eq!(month_name(13), None);
    }

    #[test]
    fn quarter_parses_with_or_without_prefix() {
        assert_eq!("Q2".parse::<Quarter>().unwrap(), Quarter::Q2);
        assert_eq!("4".parse::<Quarter>().unwrap(), Quarter::Q4);
        assert!("Q5".parse::<Quarter>().is_err());
        assert_eq!(Quarter::Q3.to_string(), "Q3");
    }

    // ── Period filter ─────────────────────────────────────────────────────────

    #[test]
    fn period_filter_excludes_only_rows_it_cannot_place() {
        let b = TimeBucketer::default();
        let mut placed = row();
        placed.inception_month = Some(5);
        let unplaced = row();

        let open = PeriodFilter::default();
        assert!(open.matches(&b, &placed) && open.matches(&b, &unplaced));

        let q2 = PeriodFilter { quarter: Some(Quarter::Q2), month: None };
        assert!(q2.matches(&b, &placed));
        assert!(!q2.matches(&b, &unplaced));

        let june = PeriodFilter { quarter: None, month: Some(6) };
        assert!(!june.matches(&b, &placed));
    }
}
