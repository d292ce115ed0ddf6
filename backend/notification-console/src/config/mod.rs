use serde::Deserialize;
use sns_shared::SnsConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub console: ConsoleConfig,
    pub sns: SnsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Aws,
    Memory,
}

/// Console settings, `CONSOLE_`-prefixed in the environment
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_backend")]
    pub backend: BackendKind,
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    #[serde(default = "default_topic_prefix")]
    pub topic_prefix: String,
    #[serde(default = "default_message_body")]
    pub message_body: String,
    #[serde(default = "default_message_subject")]
    pub message_subject: String,
    #[serde(default = "default_notification_title")]
    pub notification_title: String,
    /// Registration token to start with, until the transport refreshes it
    #[serde(default)]
    pub device_token: Option<String>,
}

fn default_backend() -> BackendKind {
    BackendKind::Aws
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".sns-console.json")
}

fn default_topic_prefix() -> String {
    "AmazonSNSTest".to_string()
}

fn default_message_body() -> String {
    "Test message".to_string()
}

fn default_message_subject() -> String {
    "Amazon SNS Test".to_string()
}

fn default_notification_title() -> String {
    fcm_receiver::DEFAULT_NOTIFICATION_TITLE.to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            store_path: default_store_path(),
            topic_prefix: default_topic_prefix(),
            message_body: default_message_body(),
            message_subject: default_message_subject(),
            notification_title: default_notification_title(),
            device_token: None,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let console: ConsoleConfig = envy::prefixed("CONSOLE_").from_env()?;
        let sns = SnsConfig::from_env()?;

        if console.backend == BackendKind::Aws && sns.platform_application_arn.is_empty() {
            anyhow::bail!("SNS_PLATFORM_APPLICATION_ARN must be set for the aws backend");
        }

        Ok(Config { console, sns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_defaults() {
        let config: ConsoleConfig =
            envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.backend, BackendKind::Aws);
        assert_eq!(config.store_path, PathBuf::from(".sns-console.json"));
        assert_eq!(config.topic_prefix, "AmazonSNSTest");
        assert_eq!(config.message_body, "Test message");
        assert_eq!(config.message_subject, "Amazon SNS Test");
        assert!(config.device_token.is_none());
    }

    #[test]
    fn test_console_overrides() {
        let config: ConsoleConfig = envy::from_iter(vec![
            ("BACKEND".to_string(), "memory".to_string()),
            ("STORE_PATH".to_string(), "/tmp/ids.json".to_string()),
            ("DEVICE_TOKEN".to_string(), "tok".to_string()),
        ])
        .unwrap();
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.store_path, PathBuf::from("/tmp/ids.json"));
        assert_eq!(config.device_token.as_deref(), Some("tok"));
    }
}
