//! # Code Quality Evaluator
//!
//! Compares "usual" and "popular" repository groups from crawl result files
//! and prints descriptive statistics, Mann-Whitney U results and the
//! log-star trend of each metric.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

use smell_of_stars::config::ConfigManager;
use smell_of_stars::evaluation::{
    EvaluationReport, Evaluator, GroupSummary, LogTrend, Summary, DEFAULT_TREND_POINTS,
};
use smell_of_stars::logging::init_structured_logging;

#[derive(Parser, Debug)]
#[command(name = "evaluate")]
#[command(about = "Compare code quality of usual and popular repositories")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Result files with "usual" repositories (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    usual: Vec<PathBuf>,

    /// Result files with "popular" repositories (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    popular: Vec<PathBuf>,

    /// Print the full report as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Sampled points per trend line
    #[arg(long, default_value_t = DEFAULT_TREND_POINTS)]
    trend_points: usize,

    /// Configuration file (logging section only)
    #[arg(short, long, env = "CRAWLER_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigManager::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .into_config();
    init_structured_logging("evaluate", &config.logging);

    let report = Evaluator::load(&cli.usual, &cli.popular)
        .with_trend_points(cli.trend_points)
        .evaluate()
        .context("Evaluation failed")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &EvaluationReport) {
    println!("Descriptive Statistics:");
    print_group("Usual", &report.usual);
    print_group("Popular", &report.popular);

    println!("Mann-Whitney U-Test Results:");
    let tests = &report.mann_whitney;
    println!(
        "smells: U-Statistic = {}, p-Value = {}",
        tests.smells.u, tests.smells.p
    );
    println!(
        "complexity: U-Statistic = {}, p-Value = {}",
        tests.complexity.u, tests.complexity.p
    );
    println!();

    println!("Trend against log10(stars):");
    print_trend("smells", report.trends.smells.as_ref());
    print_trend("complexity", report.trends.complexity.as_ref());
}

fn print_group(label: &str, group: &GroupSummary) {
    println!("{label} Repositories (Count: {}):", group.count);
    println!("{:>6} {:>14} {:>14}", "", "smells", "complexity");

    let rows: [(&str, fn(&Summary) -> f64); 7] = [
        ("mean", |s: &Summary| s.mean),
        ("std", |s: &Summary| s.std),
        ("min", |s: &Summary| s.min),
        ("25%", |s: &Summary| s.p25),
        ("50%", |s: &Summary| s.p50),
        ("75%", |s: &Summary| s.p75),
        ("max", |s: &Summary| s.max),
    ];
    for (name, field) in rows {
        println!(
            "{name:>6} {:>14.6} {:>14.6}",
            field(&group.smells),
            field(&group.complexity)
        );
    }
    println!();
}

fn print_trend(metric: &str, trend: Option<&LogTrend>) {
    match trend {
        Some(trend) => println!(
            "{metric}: slope = {:.6}, intercept = {:.6}, r = {:.4}",
            trend.slope, trend.intercept, trend.r
        ),
        None => println!("{metric}: not enough spread in star counts to fit a trend"),
    }
}
