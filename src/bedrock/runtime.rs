use crate::error::{BedrockError, Result};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{
    config::http::HttpResponse,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::Blob,
    types::{AsyncInvokeOutputDataConfig, AsyncInvokeS3OutputDataConfig},
    Client,
};
use aws_smithy_types::{Document, Number};
use serde_json::Value;
use std::collections::HashMap;

/// The two remote calls the invoker needs. Implemented over the Bedrock
/// runtime API; tests substitute their own.
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Synchronous `InvokeModel`; returns the raw response body.
    async fn invoke_model(&self, model_id: &str, body: &Value) -> Result<Vec<u8>>;

    /// `StartAsyncInvoke`; returns the invocation ARN. The same
    /// `client_token` is reused across retries so the job starts at most once.
    async fn start_async_invoke(
        &self,
        model_id: &str,
        body: &Value,
        output_location: &str,
        client_token: &str,
    ) -> Result<String>;
}

#[derive(Clone)]
pub struct BedrockRuntime {
    client: Client,
}

impl BedrockRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ModelRuntime for BedrockRuntime {
    async fn invoke_model(&self, model_id: &str, body: &Value) -> Result<Vec<u8>> {
        let request_json = serde_json::to_vec(body)?;

        let response = self
            .client
            .invoke_model()
            .model_id(model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(request_json))
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(response.body.into_inner())
    }

    async fn start_async_invoke(
        &self,
        model_id: &str,
        body: &Value,
        output_location: &str,
        client_token: &str,
    ) -> Result<String> {
        let s3_output = AsyncInvokeS3OutputDataConfig::builder()
            .s3_uri(output_location)
            .build()
            .map_err(|e| BedrockError::ConfigError(format!("Invalid output location: {}", e)))?;

        let response = self
            .client
            .start_async_invoke()
            .client_request_token(client_token)
            .model_id(model_id)
            .model_input(json_to_document(body))
            .output_data_config(AsyncInvokeOutputDataConfig::S3OutputDataConfig(s3_output))
            .send()
            .await
            .map_err(classify_sdk_error)?;

        Ok(response.invocation_arn().to_string())
    }
}

/// Splits SDK failures into retryable network trouble and provider rejections.
pub(crate) fn classify_sdk_error<E>(err: SdkError<E, HttpResponse>) -> BedrockError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let status_code = err
        .raw_response()
        .map(|raw| raw.status().as_u16())
        .unwrap_or(0);

    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            BedrockError::TransientNetworkError {
                status_code,
                message: DisplayErrorContext(&err).to_string(),
            }
        }
        SdkError::ServiceError(context) => {
            let service_error = context.err();
            let code = service_error.code().unwrap_or("unknown");
            log::error!("Bedrock service error code: {:?}", code);
            log::error!(
                "Bedrock service error message: {:?}",
                service_error.message()
            );
            let message = format!(
                "{} - {}",
                code,
                service_error.message().unwrap_or("no message")
            );
            if is_transient(status_code, code) {
                BedrockError::TransientNetworkError {
                    status_code,
                    message,
                }
            } else {
                BedrockError::ProviderError {
                    status_code,
                    message,
                }
            }
        }
        _ => BedrockError::ProviderError {
            status_code,
            message: DisplayErrorContext(&err).to_string(),
        },
    }
}

/// Server faults and throttling are worth another attempt; validation,
/// access and quota errors are not.
pub fn is_transient(status_code: u16, code: &str) -> bool {
    matches!(
        code,
        "ThrottlingException" | "ModelNotReadyException" | "ServiceUnavailableException"
    ) || (500..600).contains(&status_code)
}

pub(crate) fn json_to_document(value: &Value) -> Document {
    match value {
        Value::Null => Document::Null,
        Value::Bool(b) => Document::Bool(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Document::Number(Number::PosInt(u))
            } else if let Some(i) = n.as_i64() {
                Document::Number(Number::NegInt(i))
            } else {
                Document::Number(Number::Float(n.as_f64().unwrap_or_default()))
            }
        }
        Value::String(s) => Document::String(s.clone()),
        Value::Array(items) => Document::Array(items.iter().map(json_to_document).collect()),
        Value::Object(map) => Document::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_document(v)))
                .collect::<HashMap<_, _>>(),
        ),
    }
}
