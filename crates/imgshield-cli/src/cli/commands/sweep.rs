//! `imgshield sweep` – one maintenance pass over the persistent cache.

use anyhow::Result;
use imgshield_core::pipeline::ClassificationPipeline;

pub async fn run_sweep(pipeline: &ClassificationPipeline) -> Result<()> {
    if pipeline.store().is_none() {
        anyhow::bail!("persistent store is unavailable; nothing to sweep");
    }
    let report = pipeline.run_maintenance().await;
    println!("evicted:         {}", report.evicted);
    println!("expired records: {}", report.expired);
    println!("stale endpoints: {}", report.stale_histories);
    println!(
        "stats saved:     {}",
        if report.stats_saved { "yes" } else { "no" }
    );
    Ok(())
}
