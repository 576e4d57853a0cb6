use std::env;
use std::time::Duration;

pub const DEFAULT_REGION: &str = "us-west-2";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub use_psql: bool,
    pub bedrock: Option<BedrockConfig>,
    pub postgres: Option<PostgresConfig>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        PostgresConfig {
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
        }
    }
}

impl PostgresConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let host = env::var("POSTGRES_HOST").ok();
        let port = env::var("POSTGRES_PORT").ok().and_then(|s| s.parse().ok());
        let username = env::var("POSTGRES_USERNAME").ok();
        let password = env::var("POSTGRES_PASSWORD").ok();
        let database = env::var("POSTGRES_DATABASE").ok();

        PostgresConfig {
            host,
            port,
            username,
            password,
            database,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_connection_info(
        mut self,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Self {
        self.host = Some(host.into());
        self.port = Some(port);
        self.database = Some(database.into());
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            use_psql: false,
            bedrock: None,
            postgres: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `USE_PSQL` and, when set, the `POSTGRES_*` variables.
    pub fn from_env() -> Self {
        let use_psql = env::var("USE_PSQL").ok().map_or(false, |val| val == "true");

        Config {
            use_psql,
            bedrock: Some(BedrockConfig::from_env()),
            postgres: use_psql.then(PostgresConfig::from_env),
        }
    }

    pub fn with_bedrock(mut self, config: BedrockConfig) -> Self {
        self.bedrock = Some(config);
        self
    }

    pub fn with_postgres(mut self, config: PostgresConfig) -> Self {
        self.postgres = Some(config);
        self.use_psql = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct BedrockConfig {
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Bucket that receives asynchronous (video) job output.
    pub bucket_name: Option<String>,
    pub output_prefix: Option<String>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub max_attempts: u32,
}

impl Default for BedrockConfig {
    fn default() -> Self {
        BedrockConfig {
            region: None,
            access_key: None,
            secret_key: None,
            bucket_name: None,
            output_prefix: None,
            connect_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl BedrockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let region = env::var("AWS_REGION")
            .or_else(|_| env::var("AWS_DEFAULT_REGION"))
            .ok();
        let access_key = env::var("AWS_ACCESS_KEY_ID").ok();
        let secret_key = env::var("AWS_SECRET_ACCESS_KEY").ok();
        let bucket_name = env::var("BEDROCK_BUCKET_NAME").ok();
        let output_prefix = env::var("BEDROCK_OUTPUT_PREFIX").ok();
        let secs = |name: &str| {
            env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        };
        let max_attempts = env::var("BEDROCK_MAX_ATTEMPTS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        BedrockConfig {
            region,
            access_key,
            secret_key,
            bucket_name,
            output_prefix,
            connect_timeout: secs("BEDROCK_CONNECT_TIMEOUT_SECS"),
            read_timeout: secs("BEDROCK_READ_TIMEOUT_SECS"),
            max_attempts,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_credentials(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.access_key = Some(access_key.into());
        self.secret_key = Some(secret_key.into());
        self
    }

    pub fn with_bucket(mut self, bucket_name: impl Into<String>) -> Self {
        self.bucket_name = Some(bucket_name.into());
        self
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = Some(prefix.into());
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn region_or_default(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    /// `s3://bucket[/prefix]`, or `None` when no bucket is configured.
    pub fn output_location(&self) -> Option<String> {
        let bucket = self.bucket_name.as_deref()?.trim_start_matches("s3://");
        let bucket = bucket.trim_end_matches('/');
        match self
            .output_prefix
            .as_deref()
            .map(|p| p.trim_matches('/'))
            .filter(|p| !p.is_empty())
        {
            Some(prefix) => Some(format!("s3://{}/{}", bucket, prefix)),
            None => Some(format!("s3://{}", bucket)),
        }
    }
}
