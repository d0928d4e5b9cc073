use std::collections::HashMap;
use std::env;
use std::io::{self, BufWriter, Write};

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use reinsight::normalize::normalize_all;
use reinsight::synth::{SynthConfig, generate_book};

fn main() -> io::Result<()> {
    let mut config = SynthConfig::canonical();

    let mut args = env::args().skip(1);
    if let Some(n) = args.next().and_then(|s| s.parse().ok()) {
        config.policies = n;
    }
    if let Some(seed) = args.next().and_then(|s| s.parse().ok()) {
        config.seed = seed;
    }

    let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
    let book = generate_book(&config, &mut rng);

    // NDJSON to stdout.
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for record in &book {
        serde_json::to_writer(&mut out, record)?;
        writeln!(out)?;
    }
    out.flush()?;

    // Per-class summary to stderr.
    let rows = normalize_all(&book);
    let mut premium: HashMap<&str, f64> = HashMap::new();
    let mut incurred: HashMap<&str, f64> = HashMap::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in &rows {
        let class = r.class.as_deref().unwrap_or("-");
        *premium.entry(class).or_insert(0.0) += r.premium;
        *incurred.entry(class).or_insert(0.0) += r.incurred_claims();
        *counts.entry(class).or_insert(0) += 1;
    }

    eprintln!(
        "synth_book: {} policies, seed {}, UY {}–{}",
        book.len(),
        config.seed,
        config.first_year,
        config.last_year
    );
    let mut classes: Vec<&str> = counts.keys().copied().collect();
    classes.sort_unstable();
    for c in classes {
        let p = premium[c];
        let lr = if p > 0.0 { incurred[c] / p * 100.0 } else { 0.0 };
        eprintln!("  class={c:<12}  policies={:>5}  premium={:>14.0}  loss_ratio={lr:>6.1}%", counts[c], p);
    }
    Ok(())
}
