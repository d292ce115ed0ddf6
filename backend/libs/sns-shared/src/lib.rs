//! Amazon SNS integration library for topic, endpoint and subscription management
//!
//! This library provides:
//! - A [`NotificationBackend`] trait covering the SNS operations the console uses
//! - [`SnsClient`], the AWS SDK implementation with error-kind classification
//!   and opt-in retries for throttled or transient failures
//! - [`InMemoryBackend`], a local implementation for tests and offline runs
//!
//! # Example
//!
//! ```no_run
//! use sns_shared::{Message, NotificationBackend, SnsClient, SnsConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SnsClient::new(&SnsConfig::from_env()?).await?;
//!
//!     let topic = client.create_topic("AmazonSNSTest").await?;
//!     client.subscribe_email(&topic, "ops@example.com").await?;
//!     client
//!         .publish(&topic, &Message::new("Test message").with_subject("Amazon SNS Test"))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod memory;
pub mod models;
pub mod wait;

pub use backend::NotificationBackend;
pub use client::SnsClient;
pub use config::SnsConfig;
pub use error::{ConfigError, SnsError};
pub use memory::{InMemoryBackend, PushData, SentEmail};
pub use models::{EndpointId, Message, Protocol, Subscription, SubscriptionId, TopicId};
pub use wait::wait_until;
