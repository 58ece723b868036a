//! marga-nav - run the navigation loop over a set of maze seeds
//!
//! # Usage
//!
//! ```bash
//! # Default seeds (6, 243, 463), Unknown mode, 150 s per seed
//! cargo run --release
//!
//! # Custom config, Known mode, all seeds in parallel, JSON report
//! cargo run --release -- --config marga.toml --mode known --jobs 3 --report results.json
//! ```
//!
//! Exit status is 0 only when every seed reaches its goal.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use marga_nav::config::{Config, ConfigOverrides};
use marga_nav::engine::{BatchReport, run_batch};
use marga_nav::navigation::NavigationMode;

#[derive(Parser, Debug)]
#[command(name = "marga-nav")]
#[command(about = "Drive a simulated robot through seeded mazes")]
struct Args {
    /// Maze seeds to run
    #[arg(value_name = "SEED", default_values_t = [6u64, 243, 463])]
    seeds: Vec<u64>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Navigation mode (overrides the config file)
    #[arg(short, long, value_enum)]
    mode: Option<NavigationMode>,

    /// Wall-clock limit per seed in seconds
    #[arg(short, long)]
    time_limit: Option<f32>,

    /// Hard cap on ticks per seed
    #[arg(long)]
    max_steps: Option<u64>,

    /// Seeds run concurrently
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Write a JSON report here
    #[arg(short, long)]
    report: Option<PathBuf>,

    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::error!("Failed to load {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        },
        None => Config::default(),
    };

    let overrides = ConfigOverrides {
        seed: None,
        mode: args.mode,
        time_limit_s: args.time_limit,
        max_steps: args.max_steps,
    };

    log::info!("marga-nav starting");
    log::info!("  Seeds: {:?}", args.seeds);
    log::info!("  Mode: {}", overrides.mode.unwrap_or(config.navigation.mode));
    log::info!("  Matcher: {}", config.matching.algorithm);
    log::info!("  Jobs: {}", args.jobs.max(1));

    let report = run_batch(&config, &args.seeds, &overrides, args.jobs);
    print_summary(&report);

    if let Some(path) = &args.report {
        match report.write_json(path) {
            Ok(()) => log::info!("Report written to {}", path.display()),
            Err(e) => log::error!("Failed to write report {}: {}", path.display(), e),
        }
    }

    if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(report: &BatchReport) {
    for run in &report.runs {
        let status = if run.passed() { "PASS" } else { "FAIL" };
        println!(
            "seed={} | {} | steps={} | time={:.1}s",
            run.seed,
            status,
            run.steps,
            run.elapsed.as_secs_f64()
        );
        if !run.passed() {
            println!("    {}", run.outcome);
        }
    }
    println!(
        "{}/{} seeds reached the goal",
        report.passed_count(),
        report.runs.len()
    );
}
