use crate::{
    bedrock::runtime::ModelRuntime,
    error::{BedrockError, Result},
    logger,
    models::{ImageInvokeResponse, ModelFamily, ProviderResponse},
};
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const VIDEO_OUTPUT_FILE: &str = "output.mp4";

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first call included.
    pub max_attempts: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(20),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_intervals(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_interval = initial;
        self.max_interval = max;
        self
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_multiplier(self.multiplier)
            .with_max_elapsed_time(None)
            .build()
    }
}

/// Calls Bedrock models with a fixed retry budget for transient failures.
#[derive(Clone)]
pub struct ProviderInvoker {
    runtime: Arc<dyn ModelRuntime>,
    retry: RetryPolicy,
}

impl ProviderInvoker {
    pub fn new(runtime: Arc<dyn ModelRuntime>) -> Self {
        Self {
            runtime,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Dispatches on the family: image models answer immediately, video
    /// models hand back a job handle.
    pub async fn invoke(
        &self,
        family: ModelFamily,
        model_id: &str,
        body: &Value,
        output_location: Option<&str>,
    ) -> Result<ProviderResponse> {
        if family.is_async() {
            let output_location = output_location.ok_or_else(|| {
                BedrockError::ConfigError(format!(
                    "{} writes to object storage; configure an output bucket",
                    family.name()
                ))
            })?;
            let job_handle = self.invoke_async(model_id, body, output_location).await?;
            Ok(ProviderResponse::Deferred { job_handle })
        } else {
            let images = self.invoke_sync(model_id, body).await?;
            Ok(ProviderResponse::Immediate { images })
        }
    }

    /// Returns the base64 images in the order the model produced them.
    pub async fn invoke_sync(&self, model_id: &str, body: &Value) -> Result<Vec<String>> {
        log::info!("Generating image with model: {}", model_id);
        let _timer = logger::timer(&format!("invoke {}", model_id));

        let response_bytes = self
            .with_retry(model_id, || self.runtime.invoke_model(model_id, body))
            .await?;

        parse_image_response(&response_bytes)
    }

    /// Starts a video job writing to `output_location` and returns its ARN.
    pub async fn invoke_async(
        &self,
        model_id: &str,
        body: &Value,
        output_location: &str,
    ) -> Result<String> {
        log::info!(
            "Starting async invocation of {} into {}",
            model_id,
            output_location
        );
        let client_token = Uuid::new_v4().to_string();

        let job_handle = self
            .with_retry(model_id, || {
                self.runtime
                    .start_async_invoke(model_id, body, output_location, &client_token)
            })
            .await?;

        log::info!("Async invocation started: {}", job_handle);
        Ok(job_handle)
    }

    async fn with_retry<T, F, Fut>(&self, model_id: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut schedule = self.retry.schedule();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(value) => return Ok(value),
                Err(BedrockError::TransientNetworkError {
                    status_code,
                    message,
                }) => {
                    if attempt >= max_attempts {
                        log::error!(
                            "{} failed after {} attempts: {}",
                            model_id,
                            attempt,
                            message
                        );
                        return Err(BedrockError::ProviderError {
                            status_code,
                            message: format!("{} (gave up after {} attempts)", message, attempt),
                        });
                    }
                    let delay = schedule.next_backoff().unwrap_or(self.retry.max_interval);
                    log::warn!(
                        "Transient failure from {} (attempt {}/{}), retrying in {:?}: {}",
                        model_id,
                        attempt,
                        max_attempts,
                        delay,
                        message
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub fn parse_image_response(response_bytes: &[u8]) -> Result<Vec<String>> {
    let response: ImageInvokeResponse = serde_json::from_slice(response_bytes)
        .map_err(|e| BedrockError::ResponseError(e.to_string()))?;

    if let Some(error) = response.error.filter(|e| !e.is_empty()) {
        return Err(BedrockError::ResponseError(error));
    }
    if let Some(reason) = response.finish_reasons.into_iter().flatten().next() {
        return Err(BedrockError::ResponseError(format!(
            "Generation stopped: {}",
            reason
        )));
    }
    if response.images.is_empty() {
        return Err(BedrockError::ResponseError("No images generated".into()));
    }

    Ok(response.images)
}

/// Where a finished video job leaves its media:
/// `{output_location}/{invocation id}/output.mp4`.
pub fn video_output_uri(output_location: &str, job_handle: &str) -> String {
    let invocation_id = job_handle.rsplit('/').next().unwrap_or(job_handle);
    format!(
        "{}/{}/{}",
        output_location.trim_end_matches('/'),
        invocation_id,
        VIDEO_OUTPUT_FILE
    )
}
