pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

use crate::{
    config::Config,
    error::Result,
    models::{HistoryRecord, MediaType},
};
use std::collections::HashSet;
use std::sync::Arc;

pub use memory::MemoryHistoryStorage;
#[cfg(feature = "postgres")]
pub use postgres::PostgresHistoryStorage;
pub use traits::HistoryStorage;

/// Owns the generation history. Appends and bulk clears are the only
/// mutations; reads come back newest first.
pub struct HistoryStore {
    backend: Arc<dyn HistoryStorage>,
}

impl HistoryStore {
    pub async fn new(config: &Config) -> Result<Self> {
        let backend: Arc<dyn HistoryStorage> = if config.use_psql {
            #[cfg(feature = "postgres")]
            {
                let postgres_config = config.postgres.clone().ok_or_else(|| {
                    crate::error::BedrockError::ConfigError("PostgreSQL config required".into())
                })?;
                Arc::new(PostgresHistoryStorage::new(postgres_config).await?)
            }
            #[cfg(not(feature = "postgres"))]
            {
                return Err(crate::error::BedrockError::ConfigError(
                    "PostgreSQL feature not enabled".into(),
                ));
            }
        } else {
            Arc::new(MemoryHistoryStorage::new())
        };

        Ok(Self { backend })
    }

    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryHistoryStorage::new()))
    }

    pub fn with_backend(backend: Arc<dyn HistoryStorage>) -> Self {
        Self { backend }
    }

    pub fn storage(&self) -> &Arc<dyn HistoryStorage> {
        &self.backend
    }

    pub async fn append(&self, record: HistoryRecord) -> Result<()> {
        log::debug!(
            "Recording {} from {} ({})",
            record.media_type,
            record.model_id,
            record.id
        );
        self.backend.append(record).await
    }

    /// Records whose media type is in `filter`, newest first. Records created
    /// at the same instant keep the order they were appended in.
    pub async fn list(&self, filter: &HashSet<MediaType>) -> Result<Vec<HistoryRecord>> {
        let mut records = self.backend.list(filter).await?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    pub async fn list_all(&self) -> Result<Vec<HistoryRecord>> {
        self.list(&MediaType::all().into_iter().collect()).await
    }

    /// Removes every record. Failures are logged and reported as `false`.
    pub async fn clear(&self) -> bool {
        match self.backend.clear().await {
            Ok(()) => {
                log::info!("History cleared");
                true
            }
            Err(e) => {
                log::error!("Failed to clear history: {}", e);
                false
            }
        }
    }

    pub async fn count(&self) -> Result<usize> {
        self.backend.count().await
    }

    pub async fn health_check(&self) -> Result<bool> {
        self.backend.health_check().await
    }
}
