use std::process;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use loadsweep_common::{LoadStats, PhaseSpec};
use loadsweep_runner::driver::{DriverConfig, LoadTestDriver, RunReport};

#[derive(Parser)]
#[command(
    name = "loadsweep",
    about = "Open-loop phased load generator for OpenAI-compatible endpoints"
)]
struct Args {
    /// Base URL of the target API
    #[arg(long, default_value = "http://127.0.0.1:8000/v1")]
    base_url: String,

    /// API key sent as a bearer token
    #[arg(long, default_value = "dummy-key")]
    api_key: String,

    /// Model identifier placed in every request body
    #[arg(long, default_value = "openai/gpt-oss-20b")]
    model: String,

    /// Input text placed in every request body
    #[arg(long, default_value = "Hello, who are you?")]
    input: String,

    /// Phase as RATExSECONDS (e.g. 100x10); repeat the flag to build the sweep
    #[arg(long = "phase", default_values_t = default_phases())]
    phases: Vec<PhaseSpec>,

    /// Per-request timeout (seconds)
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Log scheduler windows and drains
    #[arg(long)]
    verbose: bool,
}

/// The ladder used when no --phase flags are given: 100 to 2000 rps in five
/// ten-second steps.
fn default_phases() -> Vec<PhaseSpec> {
    [(100, 10), (500, 10), (1000, 10), (1500, 10), (2000, 10)]
        .into_iter()
        .map(|(target_rps, duration_secs)| PhaseSpec { target_rps, duration_secs })
        .collect()
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = DriverConfig {
        base_url: args.base_url,
        api_key: args.api_key,
        model: args.model,
        input: args.input,
        phases: args.phases,
        request_timeout: Duration::from_secs(args.timeout),
    };

    let driver = match LoadTestDriver::new(config) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("{e}");
            process::exit(2);
        }
    };

    spawn_interrupt_handler(driver.cancel_token());

    let report = match driver.run().await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Load test failed: {e}");
            process::exit(3);
        }
    };

    print_report(&report);

    process::exit(if report.interrupted { 1 } else { 0 });
}

/// First Ctrl-C stops new spawns and lets in-flight requests drain into a
/// partial report; a second Ctrl-C aborts the process.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; draining in-flight requests (Ctrl-C again to abort)");
            cancel.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Aborted.");
            process::exit(130);
        }
    });
}

fn print_report(report: &RunReport) {
    println!("Loadsweep Results");
    println!("=================");
    for phase in &report.phases {
        let partial = phase.stats.requests_sent < phase.spec.planned_requests();
        println!();
        println!(
            "Phase {}  target {} rps for {}s{}",
            phase.index + 1,
            phase.spec.target_rps,
            phase.spec.duration_secs,
            if partial { "  [partial]" } else { "" },
        );
        print_stats(&phase.stats);
    }
    println!();
    println!(
        "Global  ({} phase{}{})",
        report.phases.len(),
        if report.phases.len() == 1 { "" } else { "s" },
        if report.interrupted { ", interrupted" } else { "" },
    );
    print_stats(&report.global);
}

fn print_stats(stats: &LoadStats) {
    println!("  Requests sent:   {}", stats.requests_sent);
    println!("  Succeeded:       {}", stats.succeeded);
    println!("  Failed:          {}", stats.failed);
    println!("  Duration:        {:.2} s", stats.actual_duration_s);
    println!("  Achieved rate:   {:.1} rps", stats.achieved_rps);
    println!("  Latency avg:     {:.1} ms", stats.latency_avg_ms);
    println!("  Latency p50:     {:.1} ms", stats.latency_median_ms);
    println!("  Latency p95:     {:.1} ms", stats.latency_p95_ms);
    println!("  Latency p99:     {:.1} ms", stats.latency_p99_ms);
    if !stats.error_sample.is_empty() {
        println!("  Errors (sample):");
        for error in &stats.error_sample {
            println!("    - {error}");
        }
    }
}
