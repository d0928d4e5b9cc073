use rand::Rng;
use rand_distr::{Distribution, LogNormal};

use crate::record::{RawPolicyRecord, RawValue};
use crate::time::MONTH_NAMES;

/// Lines of business with their subclasses and a log-space premium model.
/// Premiums are in base-currency units.
pub struct ClassTemplate {
    pub class: &'static str,
    pub subclasses: &'static [&'static str],
    pub premium: AmountModel,
    /// Median incurred-to-premium ratio.
    pub median_loss_ratio: f64,
}

pub enum AmountModel {
    /// E[X] = exp(mu + sigma²/2).
    LogNormal { mu: f64, sigma: f64 },
}

impl AmountModel {
    pub fn sample(&self, rng: &mut impl Rng) -> f64 {
        match self {
            AmountModel::LogNormal { mu, sigma } => {
                let dist = LogNormal::new(*mu, *sigma).expect("invalid LogNormal params");
                dist.sample(rng)
            }
        }
    }
}

pub struct SynthConfig {
    pub seed: u64,
    pub policies: usize,
    pub first_year: i32,
    pub last_year: i32,
    /// Share of records exported under the legacy monetary column names.
    pub legacy_share: f64,
    /// Share of records whose premium cell is unusable text.
    pub junk_share: f64,
    pub classes: Vec<ClassTemplate>,
    pub brokers: Vec<&'static str>,
    pub cedants: Vec<&'static str>,
    /// (country, region, hub)
    pub locations: Vec<(&'static str, &'static str, &'static str)>,
    pub ext_types: Vec<&'static str>,
}

impl SynthConfig {
    pub fn canonical() -> Self {
        SynthConfig {
            seed: 42,
            policies: 5_000,
            first_year: 2016,
            last_year: 2024,
            legacy_share: 0.3,
            junk_share: 0.02,
            classes: vec![
                ClassTemplate {
                    class: "Marine",
                    subclasses: &["Hull", "Cargo", "P&I"],
                    premium: AmountModel::LogNormal { mu: 11.0, sigma: 1.1 },
                    median_loss_ratio: 0.55,
                },
                ClassTemplate {
                    class: "Property",
                    subclasses: &["Fire", "Cat XL", "Per Risk"],
                    premium: AmountModel::LogNormal { mu: 12.0, sigma: 1.3 },
                    median_loss_ratio: 0.60,
                },
                ClassTemplate {
                    class: "Engineering",
                    subclasses: &["CAR", "EAR", "Machinery"],
                    premium: AmountModel::LogNormal { mu: 10.5, sigma: 1.0 },
                    median_loss_ratio: 0.45,
                },
                ClassTemplate {
                    class: "Casualty",
                    subclasses: &["General Liability", "Professional Indemnity"],
                    premium: AmountModel::LogNormal { mu: 10.8, sigma: 1.2 },
                    median_loss_ratio: 0.70,
                },
                ClassTemplate {
                    class: "Energy",
                    subclasses: &["Onshore", "Offshore"],
                    premium: AmountModel::LogNormal { mu: 12.5, sigma: 1.4 },
                    median_loss_ratio: 0.50,
                },
                ClassTemplate {
                    class: "Life",
                    subclasses: &["Group Life", "Credit Life"],
                    premium: AmountModel::LogNormal { mu: 10.0, sigma: 0.9 },
                    median_loss_ratio: 0.65,
                },
            ],
            brokers: vec!["Aon Re", "Guy Carpenter", "Howden Re", "Gallagher Re", "Marsh", "Direct"],
            cedants: vec![
                "Gulf Insurance Group",
                "Warba Insurance",
                "Qatar General",
                "Oman United",
                "Arabian Shield",
                "Al Ahleia",
                "Bupa Arabia",
            ],
            locations: vec![
                ("Kuwait", "GCC", "Kuwait"),
                ("Saudi Arabia", "GCC", "Dubai"),
                ("United Arab Emirates", "GCC", "Dubai"),
                ("Qatar", "GCC", "Dubai"),
                ("Oman", "GCC", "Dubai"),
                ("Egypt", "North Africa", "Cairo"),
                ("Morocco", "North Africa", "Casablanca"),
                ("India", "Asia", "Labuan"),
                ("Malaysia", "Asia", "Labuan"),
            ],
            ext_types: vec!["Facultative", "Quota Share", "Surplus", "Excess of Loss"],
        }
    }
}

fn pick<'a, T>(items: &'a [T], rng: &mut impl Rng) -> &'a T {
    &items[rng.random_range(0..items.len())]
}

fn text(s: impl Into<String>) -> Option<RawValue> {
    Some(RawValue::Text(s.into()))
}

fn num(n: f64) -> Option<RawValue> {
    Some(RawValue::Number((n * 100.0).round() / 100.0))
}

/// Underwriting-year code in one of the spellings seen in real exports.
fn uy_code(year: i32, rng: &mut impl Rng) -> (Option<RawValue>, Option<RawValue>) {
    match rng.random_range(0..20) {
        0..=11 => (text(year.to_string()), None),
        12..=16 => (text(format!("UY {}-{}", year, year + 1)), None),
        17 => (Some(RawValue::Number(year as f64)), None),
        _ => (text("N/A"), Some(RawValue::Number(year as f64))),
    }
}

/// Inception timing: split numeric parts, a legacy free-text date, or
/// nothing at all.
fn timing(record: &mut RawPolicyRecord, year: i32, rng: &mut impl Rng) {
    let month = rng.random_range(1..=12u32);
    let day = rng.random_range(1..=28u32);
    match rng.random_range(0..20) {
        0..=9 => {
            record.inception_day = Some(RawValue::Number(day as f64));
            record.inception_month = Some(RawValue::Number(month as f64));
            if rng.random_bool(0.3) {
                record.inception_quarter = Some(RawValue::Number(((month - 1) / 3 + 1) as f64));
            }
        }
        10..=16 => {
            let name = MONTH_NAMES[month as usize - 1];
            let date = match rng.random_range(0..4) {
                0 => format!("{year}-{month:02}-{day:02}"),
                1 => format!("{day:02}/{month:02}/{year}"),
                2 => format!("{day:02}-{name}-{year}"),
                _ => format!("{name} {year}"),
            };
            record.inception_date = text(date);
        }
        _ => {}
    }
}

/// Generate a synthetic policy book. Same seed, same book.
pub fn generate_book(config: &SynthConfig, rng: &mut impl Rng) -> Vec<RawPolicyRecord> {
    let mut out = Vec::with_capacity(config.policies);
    for serial in 0..config.policies {
        let template = pick(&config.classes, rng);
        let (country, region, hub) = *pick(&config.locations, rng);
        let year = rng.random_range(config.first_year..=config.last_year);
        let (uy, inception_year) = uy_code(year, rng);

        let premium = template.premium.sample(rng);
        let loss_ratio = LogNormal::new(template.median_loss_ratio.ln(), 0.9)
            .expect("invalid LogNormal params")
            .sample(rng);
        let incurred = premium * loss_ratio;
        let paid_share: f64 = rng.random();
        let acquisition = premium * rng.random_range(0.05..0.30);
        let max_liability = premium * rng.random_range(5.0..40.0);

        let mut record = RawPolicyRecord {
            uy,
            srl: Some(RawValue::Number(serial as f64 + 1.0)),
            broker_name: if rng.random_bool(0.05) { text("  ") } else { text(*pick(&config.brokers, rng)) },
            cedant_name: text(*pick(&config.cedants, rng)),
            insured_name: text(format!("Insured {:04}", rng.random_range(1..=400))),
            class_name: text(template.class),
            subclass_name: text(*pick(template.subclasses, rng)),
            ext_type: text(*pick(&config.ext_types, rng)),
            country_name: text(country),
            region: text(region),
            hub: text(hub),
            inception_year,
            ..Default::default()
        };

        let premium_cell = if rng.random_bool(config.junk_share) { text("TBA") } else { num(premium) };
        if rng.random_bool(config.legacy_share) {
            record.gross_premium = premium_cell;
            record.acquisition = num(acquisition);
            record.paid_claims = num(incurred * paid_share);
            record.outstanding_claims = num(incurred * (1.0 - paid_share));
            record.max_liability = num(max_liability);
        } else {
            record.gross_prem_base_ccy = premium_cell;
            record.acquisition_cost_base_ccy = num(acquisition);
            record.paid_claims_base_ccy = num(incurred * paid_share);
            record.os_claims_base_ccy = num(incurred * (1.0 - paid_share));
            record.max_liability_base_ccy = num(max_liability);
        }

        timing(&mut record, year, rng);
        out.push(record);
    }
    out
}
