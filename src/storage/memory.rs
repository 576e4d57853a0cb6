use crate::{
    error::Result,
    models::{HistoryRecord, MediaType},
    storage::traits::HistoryStorage,
};
use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Process-local history. A single write lock guards every mutation, so
/// readers see a store either fully cleared or untouched.
#[derive(Default)]
pub struct MemoryHistoryStorage {
    records: RwLock<Vec<HistoryRecord>>,
}

impl MemoryHistoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStorage for MemoryHistoryStorage {
    async fn append(&self, record: HistoryRecord) -> Result<()> {
        self.records.write().await.push(record);
        Ok(())
    }

    async fn list(&self, filter: &HashSet<MediaType>) -> Result<Vec<HistoryRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| filter.contains(&record.media_type))
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().await.len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
