//! `imgshield batch` – classify several files in chunks.

use std::path::PathBuf;

use anyhow::{Context, Result};
use imgshield_core::backend::content_fingerprint;
use imgshield_core::pipeline::{BatchItem, ClassificationPipeline};

use super::classify::result_line;

pub async fn run_batch(pipeline: &ClassificationPipeline, paths: &[PathBuf], json: bool) -> Result<()> {
    let mut items = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        items.push(BatchItem::new(content_fingerprint(&content), content));
    }

    let results = pipeline.classify_batch(&items).await;
    pipeline.persist_stats().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    for (path, result) in paths.iter().zip(&results) {
        println!("{}", result_line(result, &path.display().to_string()));
    }
    let failed = results.iter().filter(|r| r.is_error()).count();
    if failed > 0 {
        println!("{failed} of {} items finished with errors", results.len());
    }
    Ok(())
}
