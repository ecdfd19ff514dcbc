//! `imgshield stats` – learned endpoint timeouts, recovery health and store size.

use anyhow::Result;
use imgshield_core::pipeline::ClassificationPipeline;
use imgshield_core::store::PersistentStore;

fn ms(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.0}"))
        .unwrap_or_else(|| "-".to_string())
}

pub async fn run_stats(pipeline: &ClassificationPipeline) -> Result<()> {
    let summaries = pipeline.stats().summaries();
    if summaries.is_empty() {
        println!("No endpoint latency recorded yet.");
    } else {
        println!(
            "{:<32} {:>7} {:>8} {:>8} {:>10}",
            "ENDPOINT", "SAMPLES", "MEAN", "STDDEV", "TIMEOUT"
        );
        for s in summaries {
            let timeout = format!(
                "{}ms{}",
                s.timeout.as_millis(),
                if s.learned { "" } else { "*" }
            );
            println!(
                "{:<32} {:>7} {:>8} {:>8} {:>10}",
                s.endpoint,
                s.samples,
                ms(s.mean_ms),
                ms(s.stddev_ms),
                timeout
            );
        }
        println!("* default timeout (not enough samples)");
    }

    let health = pipeline.recovery().health();
    println!(
        "recovery health: {} ({:.0}% of recent errors unrecovered, {} recorded)",
        health.status,
        health.recent_error_rate * 100.0,
        health.total_records
    );
    for (error_type, count) in &health.by_type {
        println!("  {:<20} {}", error_type.to_string(), count);
    }

    match pipeline.store() {
        Some(store) => match store.count_entries().await {
            Ok(n) => println!("store entries: {n}"),
            Err(e) => println!("store entries: unavailable ({e})"),
        },
        None => println!("store entries: no persistent store"),
    }
    Ok(())
}
