//! rfm-runner: headless RFM analysis runner.
//!
//! Usage:
//!   rfm-runner --transactions data/sample/transactions.json --reference-date 2024-06-30
//!   rfm-runner --synthetic 500 --seed 42 --segments champion,at_risk --json

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rfm_core::{
    aggregation::SegmentFilter,
    config::RfmConfig,
    engine::{AnalysisRun, RfmEngine},
    report::AnalysisReport,
    sample::SampleGenerator,
    segment::Segment,
    store::{Transaction, TransactionStore},
};
use std::env;

/// Accepts either a bare array or `{ "transactions": [...] }`.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum TransactionFile {
    Bare(Vec<Transaction>),
    Wrapped { transactions: Vec<Transaction> },
}

impl TransactionFile {
    fn into_store(self) -> TransactionStore {
        match self {
            Self::Bare(txns) | Self::Wrapped { transactions: txns } => txns.into(),
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let synthetic = parse_arg(&args, "--synthetic", 0usize);
    let json = args.iter().any(|a| a == "--json");
    let transactions_path = flag_value(&args, "--transactions");
    let data_dir = flag_value(&args, "--data-dir");

    let reference_date = match flag_value(&args, "--reference-date") {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("--reference-date '{raw}' is not YYYY-MM-DD"))?,
        ),
        None => None,
    };

    let filter = match flag_value(&args, "--segments") {
        Some(raw) => SegmentFilter::only(
            raw.split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<Segment>())
                .collect::<Result<Vec<_>, _>>()?,
        ),
        None => SegmentFilter::all(),
    };

    let config = match data_dir {
        Some(dir) => RfmConfig::load(dir)?,
        None => RfmConfig::reference(),
    };
    let engine = RfmEngine::new(config)?;

    let store = match (transactions_path, synthetic) {
        (Some(path), _) => load_transactions(path)?,
        (None, n) if n > 0 => {
            let as_of = reference_date.unwrap_or_else(|| chrono::Utc::now().date_naive());
            SampleGenerator::new(n, as_of).generate(seed)
        }
        (None, _) => anyhow::bail!("pass --transactions <file> or --synthetic <customers>"),
    };

    if !json {
        println!("RFM Intelligence: rfm-runner");
        println!("  transactions:   {}", store.len());
        match transactions_path {
            Some(path) => println!("  source:         {path}"),
            None       => println!("  source:         synthetic (seed {seed})"),
        }
        println!();
    }

    let run = engine.run(&store, reference_date)?;
    let report = run.report(filter);

    if json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&run, &report);
    }
    Ok(())
}

fn load_transactions(path: &str) -> Result<TransactionStore> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let file: TransactionFile = serde_json::from_str(&content)
        .with_context(|| format!("{path} is not a transaction list"))?;
    Ok(file.into_store())
}

fn print_summary(run: &AnalysisRun, report: &AnalysisReport) {
    let k = &report.kpis;
    println!("=== RUN SUMMARY ===");
    println!("  run_id:          {}", report.run_id);
    println!("  reference date:  {}", report.reference_date);
    println!("  computed at:     {}", k.computed_at.format("%Y-%m-%d %H:%M:%S"));
    println!("  rejected:        {}", run.rejected.len());
    println!("  customers:       {}", k.total_customers);
    println!("  active (≤{}d):   {}", run.active_window_days(), k.active_customers);
    println!("  champions:       {}", k.champion_customers);
    println!("  at risk:         {}", k.at_risk_customers);
    println!("  revenue:         {:.2}", k.total_revenue);
    println!("  avg recency:     {:.1} days", k.avg_recency_days);
    println!("  avg frequency:   {:.1}", k.avg_frequency);
    println!("  avg monetary:    {:.0}", k.avg_monetary);

    println!();
    println!("=== SEGMENTS ===");
    for ((count, activity), (top, revenue)) in report
        .segment_distribution
        .iter()
        .zip(&report.recency_frequency_comparison)
        .zip(report.top_product_by_segment.iter().zip(&report.segment_revenue_contribution))
    {
        println!(
            "  {:<18} {:>5} customers | {:>5.1}% revenue | recency {:>6} | freq {:>5} | top: {}",
            count.segment.label(),
            count.customers,
            revenue.share_pct,
            fmt_mean(activity.mean_recency_days),
            fmt_mean(activity.mean_frequency),
            top.product.as_deref().unwrap_or("-"),
        );
    }

    println!();
    println!("=== MONTHLY REVENUE ===");
    for m in &report.monthly_revenue_trend {
        let name = chrono::Month::try_from(m.month as u8)
            .map(|month| month.name())
            .unwrap_or("?");
        println!("  {:<10} {:>12.2}", name, m.revenue);
    }

    for r in &run.rejected {
        log::warn!("rejected {r}");
    }
}

fn fmt_mean(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".into())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == flag).map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
