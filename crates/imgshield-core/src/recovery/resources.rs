use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::HybridEvictionCache;
use crate::store::StoreError;

/// What recovery strategies may act on.
#[async_trait]
pub trait RecoveryResources: Send + Sync {
    type Value: Send;

    /// Last known result for `identity`, regardless of age.
    async fn stale_result(&self, identity: &str) -> Option<Self::Value>;

    async fn reinitialize_store(&self) -> Result<(), StoreError>;

    /// Free memory. Returns how many entries were released.
    async fn relieve_pressure(&self) -> usize;
}

#[async_trait]
impl<V> RecoveryResources for HybridEvictionCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    type Value = V;

    async fn stale_result(&self, identity: &str) -> Option<V> {
        self.peek_stale(identity).await
    }

    async fn reinitialize_store(&self) -> Result<(), StoreError> {
        match self.store() {
            Some(store) => store.reinitialize().await,
            None => Ok(()),
        }
    }

    async fn relieve_pressure(&self) -> usize {
        self.sweep().await
    }
}

/// The request being recovered: its identity plus the resources to act on.
pub struct RecoveryContext<'a, R: ?Sized> {
    pub identity: &'a str,
    pub resources: &'a R,
}

impl<'a, R: ?Sized> RecoveryContext<'a, R> {
    pub fn new(identity: &'a str, resources: &'a R) -> Self {
        Self { identity, resources }
    }
}
