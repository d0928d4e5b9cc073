use serde::{Deserialize, Serialize};

/// A loosely typed cell as it arrives from the data layer: exports mix
/// numbers, numeric strings and free text in the same column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl RawValue {
    /// Textual rendering used for identifier and name fields. Integral numbers
    /// print without a fractional part so `2020.0` reads back as `"2020"`.
    pub fn as_text(&self) -> String {
        match self {
            RawValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            RawValue::Number(n) => n.to_string(),
            RawValue::Text(s) => s.clone(),
            RawValue::Bool(b) => b.to_string(),
        }
    }

    /// Numeric reading; `None` for text that does not parse or for booleans.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Number(n) => Some(*n),
            RawValue::Text(s) => s.trim().parse::<f64>().ok(),
            RawValue::Bool(_) => None,
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

/// One policy line as exported by the data layer. Every field is optional;
/// monetary columns exist under a current base-currency name and a deprecated
/// legacy name, and inception timing is either split into numeric parts or
/// carried as a legacy free-text date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPolicyRecord {
    // ── Identifiers ──────────────────────────────────────────────────────────
    /// Underwriting-year code, e.g. `2021`, `"UY 2020-2021"`, `"N/A"`.
    pub uy: Option<RawValue>,
    pub srl: Option<RawValue>,

    // ── Parties ──────────────────────────────────────────────────────────────
    pub broker_name: Option<RawValue>,
    pub cedant_name: Option<RawValue>,
    pub insured_name: Option<RawValue>,

    // ── Classification ───────────────────────────────────────────────────────
    pub class_name: Option<RawValue>,
    pub subclass_name: Option<RawValue>,
    pub ext_type: Option<RawValue>,

    // ── Location ─────────────────────────────────────────────────────────────
    pub country_name: Option<RawValue>,
    pub region: Option<RawValue>,
    pub hub: Option<RawValue>,

    // ── Monetary, current base-currency columns ─────────────────────────────
    pub gross_prem_base_ccy: Option<RawValue>,
    pub acquisition_cost_base_ccy: Option<RawValue>,
    pub paid_claims_base_ccy: Option<RawValue>,
    pub os_claims_base_ccy: Option<RawValue>,
    pub max_liability_base_ccy: Option<RawValue>,

    // ── Monetary, legacy columns ────────────────────────────────────────────
    pub gross_premium: Option<RawValue>,
    pub acquisition: Option<RawValue>,
    pub paid_claims: Option<RawValue>,
    pub outstanding_claims: Option<RawValue>,
    pub max_liability: Option<RawValue>,

    // ── Inception timing ────────────────────────────────────────────────────
    pub inception_day: Option<RawValue>,
    pub inception_month: Option<RawValue>,
    pub inception_quarter: Option<RawValue>,
    pub inception_year: Option<RawValue>,
    /// Legacy free-text inception date, e.g. `"15-APR-2021"` or `"2021-04-15"`.
    pub inception_date: Option<RawValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_mixed_cell_types() {
        let json = r#"{"uy":"UY 2020-2021","srl":1042,"gross_prem_base_ccy":"1500.5","class_name":"Marine"}"#;
        let rec: RawPolicyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.uy, Some(RawValue::Text("UY 2020-2021".into())));
        assert_eq!(rec.srl, Some(RawValue::Number(1042.0)));
        assert_eq!(rec.gross_prem_base_ccy.as_ref().and_then(RawValue::as_number), Some(1500.5));
        assert!(rec.broker_name.is_none());
    }

    #[test]
    fn explicit_null_reads_as_absent() {
        let rec: RawPolicyRecord = serde_json::from_str(r#"{"gross_premium":null}"#).unwrap();
        assert!(rec.gross_premium.is_none());
    }

    #[test]
    fn integral_numbers_render_without_fraction() {
        assert_eq!(RawValue::Number(2020.0).as_text(), "2020");
        assert_eq!(RawValue::Number(12.5).as_text(), "12.5");
        assert_eq!(RawValue::Bool(true).as_number(), None);
    }
}
