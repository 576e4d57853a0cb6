use crate::{
    error::Result,
    models::{HistoryRecord, MediaType},
};
use async_trait::async_trait;
use std::collections::HashSet;

/// Persistence behind the history store.
///
/// `list` returns matching records in insertion order; ordering by time is
/// applied by [`HistoryStore`](super::HistoryStore). `clear` must remove
/// everything or nothing.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    async fn append(&self, record: HistoryRecord) -> Result<()>;
    async fn list(&self, filter: &HashSet<MediaType>) -> Result<Vec<HistoryRecord>>;
    async fn clear(&self) -> Result<()>;
    async fn count(&self) -> Result<usize>;
    async fn health_check(&self) -> Result<bool>;
}
