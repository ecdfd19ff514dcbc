use futures::future::join_all;

use super::result::ClassificationResult;
use super::ClassificationPipeline;

/// One item of a batch request.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub identifier: String,
    pub content: Vec<u8>,
}

impl BatchItem {
    pub fn new(identifier: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            identifier: identifier.into(),
            content: content.into(),
        }
    }
}

impl ClassificationPipeline {
    /// Classify `items` in chunks of `batch_size`. Items in a chunk run
    /// concurrently; the next chunk starts once the whole chunk is done.
    /// Results are in input order.
    pub async fn classify_batch(&self, items: &[BatchItem]) -> Vec<ClassificationResult> {
        let mut results = Vec::with_capacity(items.len());
        for (n, chunk) in items.chunks(self.settings.batch_size).enumerate() {
            tracing::debug!(chunk = n, size = chunk.len(), "classifying batch chunk");
            let chunk_results =
                join_all(chunk.iter().map(|item| self.classify(&item.identifier, &item.content)))
                    .await;
            results.extend(chunk_results);
        }
        results
    }
}
