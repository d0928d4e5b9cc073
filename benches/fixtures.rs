use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use reinsight::facets::{Facet, FacetIndex};
use reinsight::filter::FilterSelection;
use reinsight::normalize::{NormalizedRow, normalize_all};
use reinsight::record::RawPolicyRecord;
use reinsight::synth::{SynthConfig, generate_book};

pub struct Scenario {
    pub name: &'static str,
    pub policies: usize,
}

pub const SMALL: Scenario = Scenario { name: "small", policies: 1_000 };
pub const MEDIUM: Scenario = Scenario { name: "medium", policies: 20_000 };
pub const LARGE: Scenario = Scenario { name: "large", policies: 100_000 };

pub fn make_records(scenario: &Scenario) -> Vec<RawPolicyRecord> {
    let config = SynthConfig { policies: scenario.policies, ..SynthConfig::canonical() };
    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    generate_book(&config, &mut rng)
}

pub fn make_rows(scenario: &Scenario) -> Vec<NormalizedRow> {
    normalize_all(&make_records(scenario))
}

pub fn make_index(rows: &[NormalizedRow]) -> FacetIndex {
    FacetIndex::build(rows, 1)
}

/// A typical dashboard selection: two countries, one class, three brokers.
pub fn typical_selection() -> FilterSelection {
    FilterSelection::new()
        .with(Facet::Country, ["Kuwait", "Qatar"])
        .with(Facet::Class, ["Property"])
        .with(Facet::Broker, ["Aon Re", "Marsh", "Howden Re"])
}
