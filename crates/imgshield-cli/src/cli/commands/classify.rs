//! `imgshield classify` – classify a single file.

use std::path::Path;

use anyhow::{Context, Result};
use imgshield_core::backend::content_fingerprint;
use imgshield_core::pipeline::{ClassificationPipeline, ClassificationResult};

pub async fn run_classify(
    pipeline: &ClassificationPipeline,
    path: &Path,
    id: Option<&str>,
    json: bool,
) -> Result<()> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let identifier = match id {
        Some(id) => id.to_string(),
        None => content_fingerprint(&content),
    };
    let result = pipeline.classify(&identifier, &content).await;
    pipeline.persist_stats().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", result_line(&result, &path.display().to_string()));
    }
    Ok(())
}

/// `STATUS SCORE SOURCE LABEL`, plus the error when there is one.
pub(super) fn result_line(result: &ClassificationResult, label: &str) -> String {
    let source = format!("{:?}", result.source).to_lowercase();
    let mut line = format!(
        "{:<8} {:<6.3} {:<13} {}",
        result.status.to_string(),
        result.risk_score,
        source,
        label
    );
    if let Some(error) = &result.error {
        line.push_str(&format!("  ({error})"));
    }
    line
}
