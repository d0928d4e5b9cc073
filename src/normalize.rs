use rayon::prelude::*;
use serde::Serialize;

use crate::facets::Facet;
use crate::record::{RawPolicyRecord, RawValue};
use crate::time::{self, YearWindow};

/// Lowercased, trimmed projections used as index keys. `None` means the
/// row has nothing to contribute to that facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowKeys {
    pub broker: Option<String>,
    pub cedant: Option<String>,
    pub insured: Option<String>,
    pub class: Option<String>,
    pub subclass: Option<String>,
    pub ext_type: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub hub: Option<String>,
    pub year: Option<String>,
}

/// Canonical projection of a [`RawPolicyRecord`]. Text is trimmed, money is
/// finite and non-negative, and the year is resolved once against
/// [`YearWindow::HISTORICAL`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub uy: String,
    pub srl: String,

    pub broker: Option<String>,
    pub cedant: Option<String>,
    pub insured: Option<String>,
    pub class: Option<String>,
    pub subclass: Option<String>,
    pub ext_type: Option<String>,

    pub country: String,
    pub region: String,
    pub hub: String,

    pub premium: f64,
    pub acquisition: f64,
    pub paid_claims: f64,
    pub outstanding_claims: f64,
    pub max_liability: f64,

    pub year: Option<i32>,
    pub inception_day: Option<i64>,
    pub inception_month: Option<i64>,
    pub inception_quarter: Option<i64>,
    pub inception_year: Option<i64>,
    pub inception_date: Option<String>,

    pub keys: RowKeys,
}

impl NormalizedRow {
    pub fn incurred_claims(&self) -> f64 {
        self.paid_claims + self.outstanding_claims
    }

    pub fn facet_key(&self, facet: Facet) -> Option<&str> {
        let k = &self.keys;
        let key = match facet {
            Facet::Country => &k.country,
            Facet::Region => &k.region,
            Facet::Hub => &k.hub,
            Facet::Broker => &k.broker,
            Facet::Cedant => &k.cedant,
            Facet::Insured => &k.insured,
            Facet::Year => &k.year,
            Facet::ExtType => &k.ext_type,
            Facet::Class => &k.class,
            Facet::Subclass => &k.subclass,
        };
        key.as_deref()
    }

    /// Trimmed display spelling for a facet, `None` exactly when
    /// [`facet_key`](Self::facet_key) is `None`.
    pub fn facet_display(&self, facet: Facet) -> Option<String> {
        match facet {
            Facet::Country => non_empty(&self.country),
            Facet::Region => non_empty(&self.region),
            Facet::Hub => non_empty(&self.hub),
            Facet::Broker => self.broker.clone(),
            Facet::Cedant => self.cedant.clone(),
            Facet::Insured => self.insured.clone(),
            Facet::Year => self.year.map(|y| y.to_string()),
            Facet::ExtType => self.ext_type.clone(),
            Facet::Class => self.class.clone(),
            Facet::Subclass => self.subclass.clone(),
        }
    }
}

// ── Primitive coercions ─────────────────────────────────────────────────────

/// Trimmed text of a possibly missing cell.
pub fn norm(v: Option<&RawValue>) -> String {
    v.map(|v| v.as_text().trim().to_string()).unwrap_or_default()
}

/// Index key of a possibly missing cell.
pub fn key(v: Option<&RawValue>) -> String {
    key_of(&norm(v))
}

pub fn key_of(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Money coercion: anything non-numeric or non-finite reads as 0, and
/// negatives are clamped to 0.
pub fn safe_num(v: Option<&RawValue>) -> f64 {
    match v.and_then(RawValue::as_number) {
        Some(n) if n.is_finite() && n > 0.0 => n,
        _ => 0.0,
    }
}

fn safe_int(v: Option<&RawValue>) -> Option<i64> {
    v.and_then(RawValue::as_number)
        .filter(|n| n.is_finite() && n.fract() == 0.0)
        .map(|n| n as i64)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() { None } else { Some(s.to_string()) }
}

fn optional_text(v: Option<&RawValue>) -> Option<String> {
    non_empty(&norm(v))
}

/// Current column wins whenever it is present; the legacy alias only fills in
/// for records exported before the rename.
fn prefer<'a>(current: &'a Option<RawValue>, legacy: &'a Option<RawValue>) -> Option<&'a RawValue> {
    current.as_ref().or(legacy.as_ref())
}

// ── Record normalization ────────────────────────────────────────────────────

pub fn normalize(raw: &RawPolicyRecord) -> NormalizedRow {
    let uy = norm(raw.uy.as_ref());
    let inception_year = safe_int(raw.inception_year.as_ref());
    let year = time::resolve_year(&uy, inception_year, YearWindow::HISTORICAL);

    let broker = optional_text(raw.broker_name.as_ref());
    let cedant = optional_text(raw.cedant_name.as_ref());
    let insured = optional_text(raw.insured_name.as_ref());
    let class = optional_text(raw.class_name.as_ref());
    let subclass = optional_text(raw.subclass_name.as_ref());
    let ext_type = optional_text(raw.ext_type.as_ref());
    let country = norm(raw.country_name.as_ref());
    let region = norm(raw.region.as_ref());
    let hub = norm(raw.hub.as_ref());

    let to_key = |s: &Option<String>| s.as_deref().map(key_of);
    let keys = RowKeys {
        broker: to_key(&broker),
        cedant: to_key(&cedant),
        insured: to_key(&insured),
        class: to_key(&class),
        subclass: to_key(&subclass),
        ext_type: to_key(&ext_type),
        country: non_empty(&key_of(&country)),
        region: non_empty(&key_of(&region)),
        hub: non_empty(&key_of(&hub)),
        year: year.map(|y| y.to_string()),
    };

    NormalizedRow {
        srl: norm(raw.srl.as_ref()),
        uy,
        broker,
        cedant,
        insured,
        class,
        subclass,
        ext_type,
        country,
        region,
        hub,
        premium: safe_num(prefer(&raw.gross_prem_base_ccy, &raw.gross_premium)),
        acquisition: safe_num(prefer(&raw.acquisition_cost_base_ccy, &raw.acquisition)),
        paid_claims: safe_num(prefer(&raw.paid_claims_base_ccy, &raw.paid_claims)),
        outstanding_claims: safe_num(prefer(&raw.os_claims_base_ccy, &raw.outstanding_claims)),
        max_liability: safe_num(prefer(&raw.max_liability_base_ccy, &raw.max_liability)),
        year,
        inception_day: safe_int(raw.inception_day.as_ref()),
        inception_month: safe_int(raw.inception_month.as_ref()),
        inception_quarter: safe_int(raw.inception_quarter.as_ref()),
        inception_year,
        inception_date: optional_text(raw.inception_date.as_ref()),
        keys,
    }
}

/// Normalize a whole dataset; output order matches input order.
pub fn normalize_all(records: &[RawPolicyRecord]) -> Vec<NormalizedRow> {
    records.par_iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn text(s: &str) -> Option<RawValue> {
        Some(RawValue::from(s))
    }

    fn num(n: f64) -> Option<RawValue> {
        Some(RawValue::Number(n))
    }

    #[test]
    fn safe_num_coerces_garbage_to_zero() {
        assert_eq!(safe_num(None), 0.0);
        assert_eq!(safe_num(Some(&RawValue::from("abc"))), 0.0);
        assert_eq!(safe_num(Some(&RawValue::from("-5"))), 0.0);
        assert_eq!(safe_num(Some(&RawValue::Number(f64::NAN))), 0.0);
        assert_eq!(safe_num(Some(&RawValue::Number(f64::INFINITY))), 0.0);
        assert_eq!(safe_num(Some(&RawValue::Bool(true))), 0.0);
        assert_eq!(safe_num(Some(&RawValue::from(" 12.5 "))), 12.5);
    }

    #[test]
    fn text_is_trimmed_and_keyed_lowercase() {
        let raw = RawPolicyRecord {
            broker_name: text("  Aon Re "),
            country_name: text(" KUWAIT"),
            ..Default::default()
        };
        let row = normalize(&raw);
        assert_eq!(row.broker.as_deref(), Some("Aon Re"));
        assert_eq!(row.keys.broker.as_deref(), Some("aon re"));
        assert_eq!(row.country, "KUWAIT");
        assert_eq!(row.keys.country.as_deref(), Some("kuwait"));
    }

    #[test]
    fn blank_party_and_class_fields_become_none() {
        let raw = RawPolicyRecord {
            broker_name: text("   "),
            cedant_name: text(""),
            class_name: None,
            subclass_name: text(" "),
            ..Default::default()
        };
        let row = normalize(&raw);
        assert!(row.broker.is_none() && row.cedant.is_none() && row.insured.is_none());
        assert!(row.class.is_none() && row.subclass.is_none() && row.ext_type.is_none());
        assert!(row.keys.broker.is_none() && row.keys.country.is_none());
    }

    #[test]
    fn current_monetary_field_beats_legacy() {
        let raw = RawPolicyRecord {
            gross_prem_base_ccy: num(1_000.0),
            gross_premium: num(9_999.0),
            paid_claims: num(250.0),
            ..Default::default()
        };
        let row = normalize(&raw);
        assert_eq!(row.premium, 1_000.0);
        assert_eq!(row.paid_claims, 250.0, "legacy-only column must still be read");
        assert_eq!(row.outstanding_claims, 0.0);
    }

    #[test]
    fn year_resolution_chain() {
        let cases = [
            (text("2020"), None, Some(2020)),
            (text("UY 2020-2021"), None, Some(2020)),
            (num(2019.0), None, Some(2019)),
            (text("N/A"), num(2021.0), Some(2021)),
            (None, None, None),
        ];
        for (uy, inception_year, expected) in cases {
            let raw = RawPolicyRecord { uy: uy.clone(), inception_year, ..Default::default() };
            let row = normalize(&raw);
            assert_eq!(row.year, expected, "uy={uy:?}");
            assert_eq!(row.keys.year, expected.map(|y| y.to_string()));
        }
    }

    #[test]
    fn fractional_date_parts_are_ignored() {
        let raw = RawPolicyRecord { inception_month: num(4.5), ..Default::default() };
        assert_eq!(normalize(&raw).inception_month, None);
    }

    #[test]
    fn normalize_all_preserves_order() {
        let records: Vec<RawPolicyRecord> = (0..200)
            .map(|i| RawPolicyRecord { srl: num(i as f64), ..Default::default() })
            .collect();
        let rows = normalize_all(&records);
        let srls: Vec<String> = rows.iter().map(|r| r.srl.clone()).collect();
        let expected: Vec<String> = (0..200).map(|i: i32| i.to_string()).collect();
        assert_eq!(srls, expected);
    }

    proptest! {
        #[test]
        fn safe_num_is_finite_and_non_negative_for_any_text(s in ".*") {
            let n = safe_num(Some(&RawValue::Text(s)));
            prop_assert!(n.is_finite() && n >= 0.0);
        }

        #[test]
        fn safe_num_is_finite_and_non_negative_for_any_number(x in any::<f64>()) {
            let n = safe_num(Some(&RawValue::Number(x)));
            prop_assert!(n.is_finite() && n >= 0.0);
        }
    }
}
