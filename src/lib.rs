//! Generative media on AWS Bedrock.
//!
//! Builds request bodies for the supported image and video model families,
//! invokes them with a bounded retry budget, normalizes the media that comes
//! back and keeps a history of what was generated.

pub mod bedrock;
pub mod config;
pub mod error;
pub mod logger;
pub mod media;
pub mod models;
pub mod storage;

pub use bedrock::{BedrockClient, ProviderInvoker, RetryPolicy};
pub use config::{BedrockConfig, Config, PostgresConfig};
pub use error::{BedrockError, Result};
pub use models::*;
pub use storage::HistoryStore;
