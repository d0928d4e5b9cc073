use std::fmt;

use serde::Serialize;

use crate::normalize::NormalizedRow;

/// Every field the presentation layer can show for a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Uy,
    Srl,
    Year,
    Broker,
    Cedant,
    Insured,
    Class,
    Subclass,
    ExtType,
    Country,
    Region,
    Hub,
    Premium,
    Acquisition,
    PaidClaims,
    OutstandingClaims,
    IncurredClaims,
    MaxLiability,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue<'a> {
    Text(&'a str),
    Integer(i64),
    Amount(f64),
    Empty,
}

impl fmt::Display for CellValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(n) => write!(f, "{n}"),
            CellValue::Amount(x) => write!(f, "{x:.2}"),
            CellValue::Empty => Ok(()),
        }
    }
}

fn text(s: &str) -> CellValue<'_> {
    if s.is_empty() { CellValue::Empty } else { CellValue::Text(s) }
}

fn opt_text(s: &Option<String>) -> CellValue<'_> {
    s.as_deref().map_or(CellValue::Empty, CellValue::Text)
}

impl Column {
    pub const ALL: [Column; 18] = [
        Column::Uy,
        Column::Srl,
        Column::Year,
        Column::Broker,
        Column::Cedant,
        Column::Insured,
        Column::Class,
        Column::Subclass,
        Column::ExtType,
        Column::Country,
        Column::Region,
        Column::Hub,
        Column::Premium,
        Column::Acquisition,
        Column::PaidClaims,
        Column::OutstandingClaims,
        Column::IncurredClaims,
        Column::MaxLiability,
    ];

    /// Compact listing used by the report binary.
    pub const SUMMARY: [Column; 7] = [
        Column::Year,
        Column::Broker,
        Column::Cedant,
        Column::Class,
        Column::Country,
        Column::Premium,
        Column::IncurredClaims,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Column::Uy => "UY",
            Column::Srl => "Serial",
            Column::Year => "Year",
            Column::Broker => "Broker",
            Column::Cedant => "Cedant",
            Column::Insured => "Insured",
            Column::Class => "Class",
            Column::Subclass => "Subclass",
            Column::ExtType => "Ext. type",
            Column::Country => "Country",
            Column::Region => "Region",
            Column::Hub => "Hub",
            Column::Premium => "Premium",
            Column::Acquisition => "Acquisition",
            Column::PaidClaims => "Paid claims",
            Column::OutstandingClaims => "O/S claims",
            Column::IncurredClaims => "Incurred claims",
            Column::MaxLiability => "Max liability",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self.value(&NormalizedRow::default()), CellValue::Amount(_))
    }

    pub fn value(self, row: &NormalizedRow) -> CellValue<'_> {
        match self {
            Column::Uy => text(&row.uy),
            Column::Srl => text(&row.srl),
            Column::Year => row.year.map_or(CellValue::Empty, |y| CellValue::Integer(y as i64)),
            Column::Broker => opt_text(&row.broker),
            Column::Cedant => opt_text(&row.cedant),
            Column::Insured => opt_text(&row.insured),
            Column::Class => opt_text(&row.class),
            Column::Subclass => opt_text(&row.subclass),
            Column::ExtType => opt_text(&row.ext_type),
            Column::Country => text(&row.country),
            Column::Region => text(&row.region),
            Column::Hub => text(&row.hub),
            Column::Premium => CellValue::Amount(row.premium),
            Column::Acquisition => CellValue::Amount(row.acquisition),
            Column::PaidClaims => CellValue::Amount(row.paid_claims),
            Column::OutstandingClaims => CellValue::Amount(row.outstanding_claims),
            Column::IncurredClaims => CellValue::Amount(row.incurred_claims()),
            Column::MaxLiability => CellValue::Amount(row.max_liability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_column_reads_a_value() {
        let row = NormalizedRow {
            uy: "UY 2021".into(),
            year: Some(2021),
            broker: Some("Aon".into()),
            premium: 120.0,
            paid_claims: 20.0,
            outstanding_claims: 5.0,
            ..Default::default()
        };
        assert_eq!(Column::Uy.value(&row), CellValue::Text("UY 2021"));
        assert_eq!(Column::Year.value(&row), CellValue::Integer(2021));
        assert_eq!(Column::Broker.value(&row), CellValue::Text("Aon"));
        assert_eq!(Column::Cedant.value(&row), CellValue::Empty);
        assert_eq!(Column::Country.value(&row), CellValue::Empty);
        assert_eq!(Column::IncurredClaims.value(&row), CellValue::Amount(25.0));
        assert_eq!(Column::Premium.value(&row).to_string(), "120.00");
    }

    #[test]
    fn numeric_columns_are_the_money_columns() {
        let numeric: Vec<_> = Column::ALL.into_iter().filter(|c| c.is_numeric()).collect();
        assert_eq!(
            numeric,
            vec![
                Column::Premium,
                Column::Acquisition,
                Column::PaidClaims,
                Column::OutstandingClaims,
                Column::IncurredClaims,
                Column::MaxLiability,
            ]
        );
    }

    #[test]
    fn cells_serialize_untagged() {
        let row = NormalizedRow { hub: "Dubai".into(), ..Default::default() };
        let cells: Vec<_> = [Column::Hub, Column::Year, Column::Premium]
            .into_iter()
            .map(|c| c.value(&row))
            .collect();
        assert_eq!(serde_json::to_string(&cells).unwrap(), r#"["Dubai",null,0.0]"#);
    }
}
