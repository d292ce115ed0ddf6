use serde::Deserialize;

use crate::error::ConfigError;

/// SNS client configuration
///
/// Loaded from `SNS_`-prefixed environment variables:
/// - `SNS_ACCESS_KEY` / `SNS_SECRET_KEY`: static credentials (both or neither)
/// - `SNS_PLATFORM_APPLICATION_ARN`: platform application devices register under
/// - `SNS_REGION`: AWS region (default `us-east-1`)
/// - `SNS_ENDPOINT_URL`: endpoint override, e.g. LocalStack
/// - `SNS_MAX_RETRIES`: retries for throttled/transient failures (default 0)
#[derive(Clone, Deserialize)]
pub struct SnsConfig {
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub platform_application_arn: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub max_retries: u32,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for SnsConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            platform_application_arn: String::new(),
            region: default_region(),
            endpoint_url: None,
            max_retries: 0,
        }
    }
}

impl SnsConfig {
    pub fn new(
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        platform_application_arn: impl Into<String>,
    ) -> Self {
        Self {
            access_key: Some(access_key.into()),
            secret_key: Some(secret_key.into()),
            platform_application_arn: platform_application_arn.into(),
            ..Default::default()
        }
    }

    /// Load from the environment (after an optional `.env` file)
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        let config: SnsConfig = envy::prefixed("SNS_").from_env()?;
        config.static_credentials()?;
        Ok(config)
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Static key pair, or `None` to fall back to the default provider chain
    pub fn static_credentials(&self) -> Result<Option<(&str, &str)>, ConfigError> {
        let access = self.access_key.as_deref().filter(|k| !k.is_empty());
        let secret = self.secret_key.as_deref().filter(|k| !k.is_empty());
        match (access, secret) {
            (Some(access), Some(secret)) => Ok(Some((access, secret))),
            (None, None) => Ok(None),
            _ => Err(ConfigError::PartialCredentials),
        }
    }
}

impl std::fmt::Debug for SnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnsConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "<redacted>"))
            .field("platform_application_arn", &self.platform_application_arn)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}
