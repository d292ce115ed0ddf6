use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_sns::config::Credentials;
use aws_sdk_sns::Client;
use resilience::{with_retry, RetryPolicy};
use std::future::Future;
use tracing::{debug, info};

use crate::backend::NotificationBackend;
use crate::config::SnsConfig;
use crate::error::SnsError;
use crate::models::{EndpointId, Message, Protocol, Subscription, SubscriptionId, TopicId};

/// Custom user data attached to every platform endpoint this client registers
const ENDPOINT_USER_DATA: &str = "Android app";

/// Subscription ARN placeholder the service reports for unconfirmed subscriptions
const PENDING_CONFIRMATION: &str = "PendingConfirmation";

/// Amazon SNS implementation of [`NotificationBackend`]
///
/// Holds one authenticated SDK client and the platform application ARN;
/// nothing else. The SDK client is cheap to clone and safe to share.
#[derive(Clone)]
pub struct SnsClient {
    client: Client,
    platform_application_arn: String,
    retry: RetryPolicy,
}

impl SnsClient {
    /// Create a client from configuration
    ///
    /// Uses the static key pair when configured, otherwise the default AWS
    /// credential chain (environment, profile, instance role).
    pub async fn new(config: &SnsConfig) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let Some((access_key, secret_key)) = config
            .static_credentials()
            .context("Invalid SNS credentials")?
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "sns-shared-static",
            ));
        }

        if let Some(url) = &config.endpoint_url {
            loader = loader.endpoint_url(url);
        }

        let sdk_config = loader.load().await;

        info!(
            region = %config.region,
            platform_application_arn = %config.platform_application_arn,
            max_retries = config.max_retries,
            "Initialized SNS client"
        );

        Ok(Self::from_client(
            Client::new(&sdk_config),
            config.platform_application_arn.clone(),
            RetryPolicy::default().with_max_retries(config.max_retries),
        ))
    }

    pub fn from_client(
        client: Client,
        platform_application_arn: impl Into<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            client,
            platform_application_arn: platform_application_arn.into(),
            retry,
        }
    }

    pub fn platform_application_arn(&self) -> &str {
        &self.platform_application_arn
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, SnsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SnsError>>,
    {
        let result = with_retry(&self.retry, operation, f).await;
        if let Err(e) = &result {
            debug!(operation, error = %e, "SNS call failed");
        }
        result
    }
}

fn missing(field: &str) -> SnsError {
    SnsError::Unknown(format!("SNS response did not include {}", field))
}

fn to_subscription(sub: &aws_sdk_sns::types::Subscription, topic_id: &TopicId) -> Subscription {
    let subscription_id = sub
        .subscription_arn()
        .filter(|arn| !arn.is_empty() && *arn != PENDING_CONFIRMATION)
        .map(SubscriptionId::from);

    Subscription {
        subscription_id,
        topic_id: sub
            .topic_arn()
            .map(TopicId::from)
            .unwrap_or_else(|| topic_id.clone()),
        protocol: Protocol::from(sub.protocol().unwrap_or_default()),
        endpoint: sub.endpoint().unwrap_or_default().to_string(),
    }
}

#[async_trait]
impl NotificationBackend for SnsClient {
    async fn create_platform_endpoint(&self, device_token: &str) -> Result<EndpointId, SnsError> {
        let output = self
            .call("CreatePlatformEndpoint", || async move {
                self.client
                    .create_platform_endpoint()
                    .platform_application_arn(&self.platform_application_arn)
                    .token(device_token)
                    .custom_user_data(ENDPOINT_USER_DATA)
                    .send()
                    .await
                    .map_err(SnsError::from_sdk)
            })
            .await?;

        let endpoint_id = output
            .endpoint_arn()
            .map(EndpointId::from)
            .ok_or_else(|| missing("an endpoint ARN"))?;

        info!(endpoint_id = %endpoint_id, "Platform endpoint created");
        Ok(endpoint_id)
    }

    async fn delete_endpoint(&self, endpoint_id: &EndpointId) -> Result<(), SnsError> {
        self.call("DeleteEndpoint", || async move {
            self.client
                .delete_endpoint()
                .endpoint_arn(endpoint_id.as_str())
                .send()
                .await
                .map_err(SnsError::from_sdk)
        })
        .await?;

        info!(endpoint_id = %endpoint_id, "Platform endpoint deleted");
        Ok(())
    }

    async fn create_topic(&self, name: &str) -> Result<TopicId, SnsError> {
        let output = self
            .call("CreateTopic", || async move {
                self.client
                    .create_topic()
                    .name(name)
                    .send()
                    .await
                    .map_err(SnsError::from_sdk)
            })
            .await?;

        let topic_id = output
            .topic_arn()
            .map(TopicId::from)
            .ok_or_else(|| missing("a topic ARN"))?;

        info!(topic_id = %topic_id, name, "Topic created");
        Ok(topic_id)
    }

    async fn delete_topic(&self, topic_id: &TopicId) -> Result<(), SnsError> {
        self.call("DeleteTopic", || async move {
            self.client
                .delete_topic()
                .topic_arn(topic_id.as_str())
                .send()
                .await
                .map_err(SnsError::from_sdk)
        })
        .await?;

        info!(topic_id = %topic_id, "Topic deleted");
        Ok(())
    }

    async fn subscribe(
        &self,
        topic_id: &TopicId,
        endpoint: &str,
        protocol: Protocol,
    ) -> Result<SubscriptionId, SnsError> {
        let protocol = &protocol;
        let output = self
            .call("Subscribe", || async move {
                self.client
                    .subscribe()
                    .topic_arn(topic_id.as_str())
                    .protocol(protocol.as_str())
                    .endpoint(endpoint)
                    .return_subscription_arn(true)
                    .send()
                    .await
                    .map_err(SnsError::from_sdk)
            })
            .await?;

        let subscription_id = output
            .subscription_arn()
            .map(SubscriptionId::from)
            .ok_or_else(|| missing("a subscription ARN"))?;

        info!(
            topic_id = %topic_id,
            protocol = %protocol,
            subscription_id = %subscription_id,
            "Subscription created"
        );
        Ok(subscription_id)
    }

    async fn unsubscribe(&self, subscription_id: &SubscriptionId) -> Result<(), SnsError> {
        self.call("Unsubscribe", || async move {
            self.client
                .unsubscribe()
                .subscription_arn(subscription_id.as_str())
                .send()
                .await
                .map_err(SnsError::from_sdk)
        })
        .await?;

        info!(subscription_id = %subscription_id, "Subscription removed");
        Ok(())
    }

    async fn list_subscriptions_by_topic(
        &self,
        topic_id: &TopicId,
    ) -> Result<Vec<Subscription>, SnsError> {
        let mut subscriptions = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let token = next_token.take();
            let page = self
                .call("ListSubscriptionsByTopic", || {
                    let token = token.clone();
                    async move {
                        self.client
                            .list_subscriptions_by_topic()
                            .topic_arn(topic_id.as_str())
                            .set_next_token(token)
                            .send()
                            .await
                            .map_err(SnsError::from_sdk)
                    }
                })
                .await?;

            subscriptions.extend(
                page.subscriptions()
                    .iter()
                    .map(|s| to_subscription(s, topic_id)),
            );

            match page.next_token() {
                Some(t) if !t.is_empty() => next_token = Some(t.to_string()),
                _ => break,
            }
        }

        debug!(topic_id = %topic_id, count = subscriptions.len(), "Listed subscriptions");
        Ok(subscriptions)
    }

    async fn publish(&self, topic_id: &TopicId, message: &Message) -> Result<(), SnsError> {
        let output = self
            .call("Publish", || async move {
                self.client
                    .publish()
                    .topic_arn(topic_id.as_str())
                    .message(&message.body)
                    .set_subject(message.subject.clone())
                    .send()
                    .await
                    .map_err(SnsError::from_sdk)
            })
            .await?;

        info!(
            topic_id = %topic_id,
            message_id = ?output.message_id(),
            "Message published"
        );
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<TopicId>, SnsError> {
        let mut topics = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let token = next_token.take();
            let page = self
                .call("ListTopics", || {
                    let token = token.clone();
                    async move {
                        self.client
                            .list_topics()
                            .set_next_token(token)
                            .send()
                            .await
                            .map_err(SnsError::from_sdk)
                    }
                })
                .await?;

            topics.extend(
                page.topics()
                    .iter()
                    .filter_map(|t| t.topic_arn())
                    .map(TopicId::from),
            );

            match page.next_token() {
                Some(t) if !t.is_empty() => next_token = Some(t.to_string()),
                _ => break,
            }
        }

        Ok(topics)
    }

    async fn list_endpoints(&self) -> Result<Vec<EndpointId>, SnsError> {
        let mut endpoints = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let token = next_token.take();
            let page = self
                .call("ListEndpointsByPlatformApplication", || {
                    let token = token.clone();
                    async move {
                        self.client
                            .list_endpoints_by_platform_application()
                            .platform_application_arn(&self.platform_application_arn)
                            .set_next_token(token)
                            .send()
                            .await
                            .map_err(SnsError::from_sdk)
                    }
                })
                .await?;

            endpoints.extend(
                page.endpoints()
                    .iter()
                    .filter_map(|e| e.endpoint_arn())
                    .map(EndpointId::from),
            );

            match page.next_token() {
                Some(t) if !t.is_empty() => next_token = Some(t.to_string()),
                _ => break,
            }
        }

        Ok(endpoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_subscription_has_no_id() {
        let sdk = aws_sdk_sns::types::Subscription::builder()
            .subscription_arn(PENDING_CONFIRMATION)
            .protocol("email")
            .endpoint("ops@example.com")
            .topic_arn("arn:aws:sns:us-east-1:1:demo")
            .build();

        let sub = to_subscription(&sdk, &TopicId::from("arn:aws:sns:us-east-1:1:demo"));
        assert!(sub.is_pending());
        assert_eq!(sub.protocol, Protocol::Email);
        assert_eq!(sub.endpoint, "ops@example.com");
    }

    #[test]
    fn test_confirmed_subscription_keeps_arn() {
        let sdk = aws_sdk_sns::types::Subscription::builder()
            .subscription_arn("arn:aws:sns:us-east-1:1:demo:abc")
            .protocol("application")
            .endpoint("arn:aws:sns:us-east-1:1:endpoint/GCM/app/123")
            .build();

        let topic = TopicId::from("arn:aws:sns:us-east-1:1:demo");
        let sub = to_subscription(&sdk, &topic);
        assert_eq!(
            sub.subscription_id,
            Some(SubscriptionId::from("arn:aws:sns:us-east-1:1:demo:abc"))
        );
        assert_eq!(sub.protocol, Protocol::Application);
        assert_eq!(sub.topic_id, topic);
    }
}
