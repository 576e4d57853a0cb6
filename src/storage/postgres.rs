#[cfg(feature = "postgres")]
use crate::{
    config::PostgresConfig,
    error::{BedrockError, Result},
    models::{HistoryRecord, MediaRef, MediaType},
    storage::traits::HistoryStorage,
};

#[cfg(feature = "postgres")]
use async_trait::async_trait;
#[cfg(feature = "postgres")]
use chrono::{DateTime, Utc};
#[cfg(feature = "postgres")]
use deadpool_postgres::{Config, Pool, Runtime};
#[cfg(feature = "postgres")]
use std::collections::HashSet;
#[cfg(feature = "postgres")]
use tokio_postgres::{NoTls, Row};

#[cfg(feature = "postgres")]
pub struct PostgresHistoryStorage {
    pool: Pool,
}

#[cfg(feature = "postgres")]
impl PostgresHistoryStorage {
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        let mut cfg = Config::new();
        cfg.host = config.host;
        cfg.port = config.port;
        cfg.user = config.username;
        cfg.password = config.password;
        cfg.dbname = config.database;

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| BedrockError::ConfigError(format!("Failed to create pool: {}", e)))?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| BedrockError::StorageError(format!("Failed to get connection: {}", e)))
    }

    async fn initialize_schema(&self) -> Result<()> {
        let client = self.client().await?;

        // `seq` keeps insertion order for records created in the same instant.
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS media_history (
                seq BIGSERIAL PRIMARY KEY,
                id TEXT UNIQUE NOT NULL,
                media_type TEXT NOT NULL,
                model_id TEXT NOT NULL,
                prompt TEXT,
                media_uri TEXT,
                media_bytes BYTEA,
                details JSONB NOT NULL DEFAULT 'null',
                reference_image TEXT,
                created_at TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_media_history_type ON media_history(media_type);",
            )
            .await
            .map_err(|e| {
                BedrockError::StorageError(format!("Failed to create media_history table: {}", e))
            })?;

        log::info!("PostgreSQL history schema initialized");
        Ok(())
    }

    fn row_to_record(row: &Row) -> Result<HistoryRecord> {
        let media_type: String = row.get("media_type");
        let media_type = MediaType::from_str_opt(&media_type).ok_or_else(|| {
            BedrockError::StorageError(format!("Unknown media type in history: {}", media_type))
        })?;

        let media_uri: Option<String> = row.get("media_uri");
        let media_bytes: Option<Vec<u8>> = row.get("media_bytes");
        let media_ref = match (media_uri, media_bytes) {
            (Some(uri), _) => MediaRef::Uri(uri),
            (None, Some(bytes)) => MediaRef::Inline(bytes),
            (None, None) => {
                return Err(BedrockError::StorageError("History record without media".into()))
            }
        };
        let created_at: DateTime<Utc> = row.get("created_at");

        Ok(HistoryRecord {
            id: row.get("id"),
            media_type,
            model_id: row.get("model_id"),
            prompt: row.get("prompt"),
            media_ref,
            details: row.get("details"),
            reference_image_b64: row.get("reference_image"),
            created_at,
        })
    }
}

#[cfg(feature = "postgres")]
#[async_trait]
impl HistoryStorage for PostgresHistoryStorage {
    async fn append(&self, record: HistoryRecord) -> Result<()> {
        let client = self.client().await?;

        let (media_uri, media_bytes) = match &record.media_ref {
            MediaRef::Uri(uri) => (Some(uri.as_str()), None),
            MediaRef::Inline(bytes) => (None, Some(bytes.as_slice())),
        };

        client
            .execute(
                "INSERT INTO media_history
                 (id, media_type, model_id, prompt, media_uri, media_bytes, details,
                  reference_image, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                &[
                    &record.id,
                    &record.media_type.as_str(),
                    &record.model_id,
                    &record.prompt,
                    &media_uri,
                    &media_bytes,
                    &record.details,
                    &record.reference_image_b64,
                    &record.created_at,
                ],
            )
            .await
            .map_err(|e| BedrockError::StorageError(format!("Failed to insert record: {}", e)))?;

        Ok(())
    }

    async fn list(&self, filter: &HashSet<MediaType>) -> Result<Vec<HistoryRecord>> {
        if filter.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client().await?;
        let types: Vec<&str> = filter.iter().map(MediaType::as_str).collect();

        let rows = client
            .query(
                "SELECT id, media_type, model_id, prompt, media_uri, media_bytes, details,
                        reference_image, created_at
                 FROM media_history WHERE media_type = ANY($1) ORDER BY seq ASC",
                &[&types],
            )
            .await
            .map_err(|e| BedrockError::StorageError(format!("Failed to list history: {}", e)))?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn clear(&self) -> Result<()> {
        let mut client = self.client().await?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| BedrockError::StorageError(format!("Failed to begin clear: {}", e)))?;

        transaction
            .execute("DELETE FROM media_history", &[])
            .await
            .map_err(|e| BedrockError::StorageError(format!("Failed to clear history: {}", e)))?;

        transaction
            .commit()
            .await
            .map_err(|e| BedrockError::StorageError(format!("Failed to commit clear: {}", e)))
    }

    async fn count(&self) -> Result<usize> {
        let client = self.client().await?;
        let row = client
            .query_one("SELECT COUNT(*) FROM media_history", &[])
            .await
            .map_err(|e| BedrockError::StorageError(format!("Failed to count history: {}", e)))?;
        let count: i64 = row.get(0);
        Ok(count as usize)
    }

    async fn health_check(&self) -> Result<bool> {
        let client = self.client().await?;
        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| BedrockError::StorageError(format!("Health check failed: {}", e)))?;
        Ok(true)
    }
}

#[cfg(all(test, feature = "postgres"))]
mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Runs against the database named by `POSTGRES_*` and empties `media_history`.
    async fn storage() -> PostgresHistoryStorage {
        PostgresHistoryStorage::new(PostgresConfig::from_env())
            .await
            .unwrap()
    }

    fn record(media_type: MediaType, media_ref: MediaRef, second: u32) -> HistoryRecord {
        let created_at = Utc.with_ymd_and_hms(2026, 10, 1, 12, 0, second).unwrap();
        HistoryRecord::new(media_type, "amazon.nova-canvas-v1:0", media_ref)
            .with_prompt(Some(format!("prompt {}", second)))
            .with_details(serde_json::json!({ "seed": second }))
            .with_created_at(created_at)
    }

    #[tokio::test]
    #[ignore = "needs POSTGRES_* pointing at a scratch database"]
    async fn test_round_trip_filter_and_clear() {
        let storage = storage().await;
        storage.clear().await.unwrap();
        assert!(storage.health_check().await.unwrap());

        let jpeg = MediaRef::Inline(vec![0xFF, 0xD8, 0xFF]);
        let image = record(MediaType::Image, jpeg, 1);
        let video = record(
            MediaType::Video,
            MediaRef::Uri("s3://media-bucket/abc/output.mp4".into()),
            2,
        );
        storage.append(image.clone()).await.unwrap();
        storage.append(video.clone()).await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 2);

        let images = storage
            .list(&[MediaType::Image].into_iter().collect())
            .await
            .unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].id, image.id);
        assert_eq!(images[0].media_ref, image.media_ref);
        assert_eq!(images[0].details["seed"], 1);
        assert_eq!(images[0].created_at, image.created_at);

        let all = storage
            .list(&MediaType::all().into_iter().collect())
            .await
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![image.id.as_str(), video.id.as_str()]);
        assert_eq!(all[1].media_ref.as_uri(), video.media_ref.as_uri());

        storage.clear().await.unwrap();
        assert_eq!(storage.count().await.unwrap(), 0);
        assert!(storage.list(&HashSet::new()).await.unwrap().is_empty());
    }
}
