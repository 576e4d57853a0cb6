pub mod invoker;
pub mod payload;
pub mod runtime;

use crate::{
    config::{BedrockConfig, Config},
    error::Result,
    media::codec,
    models::{
        GenerationRequest, HistoryRecord, MediaRef, MediaType, ModelFamily, ModelInfo,
        ProviderResponse,
    },
    storage::HistoryStore,
};
use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion, Region};
use aws_sdk_bedrockruntime::{config::Credentials, Client};
use serde_json::{json, Value};
use std::sync::Arc;

pub use invoker::{ProviderInvoker, RetryPolicy};
pub use runtime::{BedrockRuntime, ModelRuntime};

#[derive(Clone)]
pub struct BedrockClient {
    invoker: ProviderInvoker,
    history: Arc<HistoryStore>,
    config: BedrockConfig,
}

impl BedrockClient {
    pub async fn new(bedrock_config: BedrockConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(bedrock_config.region_or_default().to_string()))
            .timeout_config(
                TimeoutConfig::builder()
                    .connect_timeout(bedrock_config.connect_timeout)
                    .read_timeout(bedrock_config.read_timeout)
                    .build(),
            )
            // Retries are counted by the invoker.
            .retry_config(RetryConfig::disabled());

        if let (Some(access_key), Some(secret_key)) =
            (&bedrock_config.access_key, &bedrock_config.secret_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "rgenmedia",
            ));
        }

        let aws_config = loader.load().await;
        let runtime = Arc::new(BedrockRuntime::new(Client::new(&aws_config)));

        Ok(Self::from_parts(
            runtime,
            Arc::new(HistoryStore::in_memory()),
            bedrock_config,
        ))
    }

    /// Same as [`BedrockClient::new`] with the history backend chosen by
    /// `storage_config`.
    pub async fn with_history(
        bedrock_config: BedrockConfig,
        storage_config: Config,
    ) -> Result<Self> {
        let history = HistoryStore::new(&storage_config).await?;
        let mut client = Self::new(bedrock_config).await?;
        client.history = Arc::new(history);
        Ok(client)
    }

    pub fn from_parts(
        runtime: Arc<dyn ModelRuntime>,
        history: Arc<HistoryStore>,
        config: BedrockConfig,
    ) -> Self {
        let retry = RetryPolicy::default().with_max_attempts(config.max_attempts);
        Self {
            invoker: ProviderInvoker::new(runtime).with_retry_policy(retry),
            history,
            config,
        }
    }

    pub fn invoker(&self) -> &ProviderInvoker {
        &self.invoker
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn config(&self) -> &BedrockConfig {
        &self.config
    }

    pub fn supported_models() -> Vec<ModelInfo> {
        ModelFamily::all().iter().map(ModelFamily::info).collect()
    }

    /// Runs one generation against the family's default model and returns
    /// the history records it produced.
    ///
    /// Every returned image is decoded before anything is written. Records are
    /// then appended one at a time; if an append fails the error is returned
    /// and records appended before it stay in history.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        family: ModelFamily,
    ) -> Result<Vec<HistoryRecord>> {
        self.generate_with_model(request, family, family.default_model_id())
            .await
    }

    /// [`BedrockClient::generate`] with an explicit model id, for inference
    /// profiles or pinned model versions of `family`.
    pub async fn generate_with_model(
        &self,
        request: &GenerationRequest,
        family: ModelFamily,
        model_id: &str,
    ) -> Result<Vec<HistoryRecord>> {
        let body = payload::build(request, family)?;
        log::debug!(
            "{} request body: {}",
            family.name(),
            payload::redact_media(&body)
        );

        let output_location = self.config.output_location();
        let response = self
            .invoker
            .invoke(family, model_id, &body, output_location.as_deref())
            .await?;

        let mut details = payload::redact_media(&body);
        if let Value::Object(map) = &mut details {
            map.insert("modelFamily".into(), json!(family.name()));
            map.insert("modelId".into(), json!(model_id));
        }

        let records = match response {
            ProviderResponse::Immediate { images } => {
                let mut records = Vec::with_capacity(images.len());
                for image_b64 in &images {
                    let bytes = codec::decode_base64(image_b64)?;
                    records.push(
                        HistoryRecord::new(MediaType::Image, model_id, MediaRef::Inline(bytes))
                            .with_prompt(request.prompt.clone())
                            .with_details(details.clone())
                            .with_reference_image(request.reference_image_b64.clone()),
                    );
                }
                records
            }
            ProviderResponse::Deferred { job_handle } => {
                // Deferred responses only come back when a location was configured.
                let location = output_location.unwrap_or_default();
                if let Value::Object(map) = &mut details {
                    map.insert("invocationArn".into(), json!(job_handle));
                }
                vec![HistoryRecord::new(
                    MediaType::Video,
                    model_id,
                    MediaRef::Uri(invoker::video_output_uri(&location, &job_handle)),
                )
                .with_prompt(request.prompt.clone())
                .with_details(details)
                .with_reference_image(request.reference_image_b64.clone())]
            }
        };

        for record in &records {
            self.history.append(record.clone()).await?;
        }
        log::info!(
            "{} produced {} {} record(s)",
            model_id,
            records.len(),
            family.media_type()
        );

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedrock::invoker::tests::ScriptedRuntime;
    use crate::error::BedrockError;
    use crate::media::codec::tests::png_bytes;
    use crate::models::GenerationMode;
    use crate::storage::{HistoryStorage, MemoryHistoryStorage};
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory storage that rejects every append after the first `accept`.
    struct FillingStorage {
        inner: MemoryHistoryStorage,
        accept: usize,
        appended: AtomicUsize,
    }

    #[async_trait]
    impl HistoryStorage for FillingStorage {
        async fn append(&self, record: HistoryRecord) -> Result<()> {
            if self.appended.fetch_add(1, Ordering::SeqCst) >= self.accept {
                return Err(BedrockError::StorageError("disk full".into()));
            }
            self.inner.append(record).await
        }
        async fn list(&self, filter: &HashSet<MediaType>) -> Result<Vec<HistoryRecord>> {
            self.inner.list(filter).await
        }
        async fn clear(&self) -> Result<()> {
            self.inner.clear().await
        }
        async fn count(&self) -> Result<usize> {
            self.inner.count().await
        }
        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }
    }

    fn client(runtime: Arc<ScriptedRuntime>, config: BedrockConfig) -> BedrockClient {
        with_history(runtime, HistoryStore::in_memory(), config)
    }

    fn with_history(
        runtime: Arc<ScriptedRuntime>,
        history: HistoryStore,
        config: BedrockConfig,
    ) -> BedrockClient {
        let client = BedrockClient::from_parts(runtime, Arc::new(history), config);
        let retry = crate::bedrock::invoker::tests::fast_retry();
        BedrockClient {
            invoker: client.invoker.clone().with_retry_policy(retry),
            ..client
        }
    }

    #[tokio::test]
    async fn test_text_to_image_appends_one_record_per_image() {
        let image = STANDARD.encode(png_bytes(8, 8));
        let body = serde_json::to_vec(&json!({ "images": [image, image] })).unwrap();
        let runtime = Arc::new(ScriptedRuntime::with_sync(vec![Ok(body)]));
        let client = client(runtime.clone(), BedrockConfig::new());

        let request = GenerationRequest::text_to_image("a cat")
            .with_size("SIZE_1_1")
            .with_count(2);
        let records = client
            .generate(&request, ModelFamily::NovaCanvas)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        let calls = runtime.calls.lock().unwrap();
        let sent = &calls[0].1;
        assert_eq!(calls[0].0, "amazon.nova-canvas-v1:0");
        assert_eq!(sent["imageGenerationConfig"]["numberOfImages"], 2);
        assert!(sent["textToImageParams"].get("maskPrompt").is_none());

        let images: HashSet<MediaType> = [MediaType::Image].into_iter().collect();
        let history = client.history().list(&images).await.unwrap();
        assert_eq!(history.len(), 2);
        for record in &history {
            assert_eq!(record.prompt.as_deref(), Some("a cat"));
            assert_eq!(record.details["modelFamily"], "Nova Canvas");
            assert!(record.media_ref.as_bytes().is_some());
        }
    }

    #[tokio::test]
    async fn test_text_to_video_records_output_uri() {
        let arn = "arn:aws:bedrock:us-west-2:123456789012:async-invoke/q9w8e7";
        let runtime = Arc::new(ScriptedRuntime::with_async(vec![Ok(arn.to_string())]));
        let config = BedrockConfig::new()
            .with_bucket("media-bucket")
            .with_output_prefix("video");
        let client = client(runtime.clone(), config);

        let request = GenerationRequest::text_to_video("waves at dusk");
        let records = client.generate(&request, ModelFamily::LumaRay).await.unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.media_type, MediaType::Video);
        assert_eq!(
            record.media_ref.as_uri(),
            Some("s3://media-bucket/video/q9w8e7/output.mp4")
        );
        assert_eq!(record.details["invocationArn"], arn);
        assert_eq!(client.history().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_provider() {
        let runtime = Arc::new(ScriptedRuntime::default());
        let client = client(runtime.clone(), BedrockConfig::new());

        let request = GenerationRequest::new(GenerationMode::Inpainting)
            .with_prompt("a hat")
            .with_mask_prompt("   ")
            .with_reference_image(STANDARD.encode(png_bytes(8, 8)));
        let err = client
            .generate(&request, ModelFamily::TitanImage)
            .await
            .unwrap_err();

        assert!(matches!(err, BedrockError::InvalidRequest(_)));
        assert_eq!(runtime.call_count(), 0);
        assert_eq!(client.history().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_provider_failure_leaves_history_untouched() {
        let runtime = Arc::new(ScriptedRuntime::with_sync(vec![Err(
            BedrockError::ProviderError {
                status_code: 400,
                message: "ValidationException - prompt blocked".into(),
            },
        )]));
        let client = client(runtime, BedrockConfig::new());

        let request = GenerationRequest::text_to_image("a cat");
        let result = client.generate(&request, ModelFamily::StableDiffusion).await;

        assert!(matches!(result, Err(BedrockError::ProviderError { .. })));
        assert_eq!(client.history().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_failure_keeps_earlier_records() {
        let image = STANDARD.encode(png_bytes(8, 8));
        let body = serde_json::to_vec(&json!({ "images": [image, image] })).unwrap();
        let runtime = Arc::new(ScriptedRuntime::with_sync(vec![Ok(body)]));
        let storage = FillingStorage {
            inner: MemoryHistoryStorage::new(),
            accept: 1,
            appended: AtomicUsize::new(0),
        };
        let client = with_history(
            runtime,
            HistoryStore::with_backend(Arc::new(storage)),
            BedrockConfig::new(),
        );

        let request = GenerationRequest::text_to_image("a cat").with_count(2);
        let result = client.generate(&request, ModelFamily::NovaCanvas).await;

        assert!(matches!(result, Err(BedrockError::StorageError(_))));
        assert_eq!(client.history().count().await.unwrap(), 1);
    }

    #[test]
    fn test_supported_models() {
        let models = BedrockClient::supported_models();
        assert_eq!(models.len(), 5);
        assert!(models.iter().any(|m| m.id == "luma.ray-v2:0"));
    }
}
