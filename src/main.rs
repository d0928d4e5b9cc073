use std::collections::BTreeMap;
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use reinsight::cache::{DatasetCache, NdjsonSource};
use reinsight::columns::Column;
use reinsight::config::EngineConfig;
use reinsight::dashboard::{self, DashboardQuery, DashboardView};
use reinsight::facets::Facet;
use reinsight::kpi::KpiSnapshot;
use reinsight::normalize::NormalizedRow;
use reinsight::time::{self, YearWindow};
use reinsight::{EngineError, Result};

struct Args {
    input: String,
    config: Option<String>,
    query: DashboardQuery,
    list: usize,
    json: bool,
}

fn next_value(args: &[String], i: &mut usize, flag: &str) -> Result<String> {
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| EngineError::InvalidArgument(format!("{flag} requires a value")))
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args {
        input: "book.ndjson".to_string(),
        config: None,
        query: DashboardQuery { roles: vec!["admin".to_string()], ..Default::default() },
        list: 0,
        json: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => parsed.input = next_value(args, &mut i, "--input")?,
            "--config" => parsed.config = Some(next_value(args, &mut i, "--config")?),
            "--roles" => {
                parsed.query.roles = next_value(args, &mut i, "--roles")?
                    .split(',')
                    .map(|r| r.trim().to_string())
                    .filter(|r| !r.is_empty())
                    .collect();
            }
            "--filter" => {
                // facet=value1|value2
                let pair = next_value(args, &mut i, "--filter")?;
                let (facet, values) = pair.split_once('=').ok_or_else(|| {
                    EngineError::InvalidArgument(format!("--filter expects facet=values, got {pair}"))
                })?;
                let facet: Facet = facet.parse()?;
                for v in values.split('|').filter(|v| !v.trim().is_empty()) {
                    parsed.query.selection.select(facet, v.trim());
                }
            }
            "--quarter" => parsed.query.period.quarter = Some(next_value(args, &mut i, "--quarter")?.parse()?),
            "--month" => {
                let m = next_value(args, &mut i, "--month")?;
                let month = m
                    .parse::<u32>()
                    .ok()
                    .filter(|n| (1..=12).contains(n))
                    .or_else(|| time::month_from_name(&m))
                    .ok_or_else(|| EngineError::InvalidArgument(format!("not a month: {m}")))?;
                parsed.query.period.month = Some(month);
            }
            "--window" => {
                parsed.query.window = Some(match next_value(args, &mut i, "--window")?.as_str() {
                    "reporting" => YearWindow::REPORTING,
                    "historical" => YearWindow::HISTORICAL,
                    other => {
                        return Err(EngineError::InvalidArgument(format!(
                            "--window must be reporting or historical, got {other}"
                        )));
                    }
                });
            }
            "--top" => parsed.query.breakdowns.push(next_value(args, &mut i, "--top")?.parse()?),
            "--list" => {
                let n = next_value(args, &mut i, "--list")?;
                parsed.list = n
                    .parse()
                    .map_err(|_| EngineError::InvalidArgument(format!("--list requires a count, got {n}")))?;
            }
            "--json" => parsed.json = true,
            other => return Err(EngineError::InvalidArgument(format!("unknown flag {other}"))),
        }
        i += 1;
    }
    Ok(parsed)
}

fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::canonical(),
    };
    let mut cache = DatasetCache::new(NdjsonSource::new(&args.input));
    let dataset = cache.get()?;
    info!(input = %cache.source().path().display(), rows = dataset.rows().len(), "book ready");
    let (view, rows) = dashboard::run_query(&dataset, &config, &args.query);

    if args.json {
        let json = serde_json::to_string_pretty(&view).map_err(|e| EngineError::InvalidArgument(e.to_string()))?;
        println!("{json}");
    } else {
        print_report(&view);
        if args.list > 0 {
            print_rows(&rows, args.list);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "reinsight=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();
    match parse_args(&args).and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

// ── Text report ─────────────────────────────────────────────────────────────

const THOUSANDS: f64 = 1_000.0;

fn print_kpi(k: &KpiSnapshot) {
    println!("  Premium:              {:>14.1}k", k.premium / THOUSANDS);
    println!("  Acquisition:          {:>14.1}k", k.acquisition / THOUSANDS);
    println!("  Paid claims:          {:>14.1}k", k.paid_claims / THOUSANDS);
    println!("  Outstanding claims:   {:>14.1}k", k.outstanding_claims / THOUSANDS);
    println!("  Incurred claims:      {:>14.1}k", k.incurred_claims / THOUSANDS);
    println!("  Technical result:     {:>14.1}k", k.technical_result / THOUSANDS);
    println!("  Loss ratio:           {:>14.1}%", k.loss_ratio_pct);
    println!("  Acquisition ratio:    {:>14.1}%", k.acquisition_pct);
    println!("  Combined ratio:       {:>14.1}%", k.combined_ratio_pct);
    println!("  Accounts:             {:>14}", k.number_of_accounts);
    println!("  Avg max liability:    {:>14.1}k", k.avg_max_liability / THOUSANDS);
}

fn print_period_table<K: std::fmt::Display>(title: &str, rows: &BTreeMap<K, KpiSnapshot>) {
    if rows.is_empty() {
        return;
    }
    println!("\n=== {title} ===");
    println!(
        "{:>6} | {:>12} | {:>12} | {:>7} | {:>7} | {:>7} | {:>8}",
        "Period", "Premium(k)", "Incurred(k)", "LossR%", "AcqR%", "CombR%", "Accounts"
    );
    println!("{}", "-".repeat(6 + 3 + 12 + 3 + 12 + 3 + 7 + 3 + 7 + 3 + 7 + 3 + 8));
    for (period, k) in rows {
        println!(
            "{:>6} | {:>12.1} | {:>12.1} | {:>6.1}% | {:>6.1}% | {:>6.1}% | {:>8}",
            period.to_string(),
            k.premium / THOUSANDS,
            k.incurred_claims / THOUSANDS,
            k.loss_ratio_pct,
            k.acquisition_pct,
            k.combined_ratio_pct,
            k.number_of_accounts,
        );
    }
}

fn print_report(view: &DashboardView) {
    println!(
        "=== Portfolio (dataset v{}, {} of {} visible rows) ===",
        view.dataset_version, view.matched_rows, view.visible_rows
    );
    print_kpi(&view.kpi);

    print_period_table("By underwriting year", &view.by_year);
    print_period_table("By quarter", &view.by_quarter);
    // Zero-padded so the labels sort in calendar order.
    let by_month: BTreeMap<String, KpiSnapshot> = view
        .by_month
        .iter()
        .map(|(m, k)| (format!("{:02} {}", m, time::month_name(*m).unwrap_or("?")), *k))
        .collect();
    print_period_table("By month", &by_month);

    for (facet, entries) in &view.breakdowns {
        println!("\n=== Top {} by premium ===", facet);
        for b in entries {
            println!(
                "  {:<32} {:>12.1}k  LossR {:>6.1}%  CombR {:>6.1}%",
                b.value,
                b.kpi.premium / THOUSANDS,
                b.kpi.loss_ratio_pct,
                b.kpi.combined_ratio_pct
            );
        }
    }
}

fn print_rows(rows: &[NormalizedRow], limit: usize) {
    println!("\n=== First {} matching rows ===", limit.min(rows.len()));
    let header: Vec<&str> = Column::SUMMARY.iter().map(|c| c.label()).collect();
    println!("{}", header.join(" | "));
    for row in rows.iter().take(limit) {
        let cells: Vec<String> = Column::SUMMARY.iter().map(|c| c.value(row).to_string()).collect();
        println!("{}", cells.join(" | "));
    }
}
