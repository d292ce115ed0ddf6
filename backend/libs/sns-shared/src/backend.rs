use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::SnsError;
use crate::models::{EndpointId, Message, Protocol, Subscription, SubscriptionId, TopicId};

/// Operations against a pub/sub notification backend
///
/// Implementations are stateless apart from their connection handle: no
/// caching, no local bookkeeping of created resources. Every method is a
/// single backend round trip unless documented otherwise.
#[async_trait]
pub trait NotificationBackend: Send + Sync {
    /// Register a device token under the configured platform application
    async fn create_platform_endpoint(&self, device_token: &str) -> Result<EndpointId, SnsError>;

    async fn delete_endpoint(&self, endpoint_id: &EndpointId) -> Result<(), SnsError>;

    /// Create a topic. Whether an existing name yields the existing topic or a
    /// duplicate is up to the backend.
    async fn create_topic(&self, name: &str) -> Result<TopicId, SnsError>;

    async fn delete_topic(&self, topic_id: &TopicId) -> Result<(), SnsError>;

    /// Subscribe `endpoint` to a topic
    ///
    /// For [`Protocol::Email`] the returned id denotes a subscription that
    /// stays pending until the recipient confirms it out of band.
    async fn subscribe(
        &self,
        topic_id: &TopicId,
        endpoint: &str,
        protocol: Protocol,
    ) -> Result<SubscriptionId, SnsError>;

    async fn unsubscribe(&self, subscription_id: &SubscriptionId) -> Result<(), SnsError>;

    /// All subscriptions of a topic, every page
    async fn list_subscriptions_by_topic(
        &self,
        topic_id: &TopicId,
    ) -> Result<Vec<Subscription>, SnsError>;

    /// Fan-out to subscribers is entirely the backend's business
    async fn publish(&self, topic_id: &TopicId, message: &Message) -> Result<(), SnsError>;

    async fn list_topics(&self) -> Result<Vec<TopicId>, SnsError>;

    /// Endpoints registered under the configured platform application
    async fn list_endpoints(&self) -> Result<Vec<EndpointId>, SnsError>;

    async fn subscribe_email(
        &self,
        topic_id: &TopicId,
        email_address: &str,
    ) -> Result<SubscriptionId, SnsError> {
        self.subscribe(topic_id, email_address, Protocol::Email).await
    }

    async fn subscribe_device(
        &self,
        topic_id: &TopicId,
        endpoint_id: &EndpointId,
    ) -> Result<SubscriptionId, SnsError> {
        self.subscribe(topic_id, endpoint_id.as_str(), Protocol::Application)
            .await
    }

    /// Unsubscribe an email address by scanning the topic's subscriptions
    ///
    /// Returns the removed subscription id. No matching subscription is not
    /// an error: the call is a no-op returning `None`. When the only matches
    /// are still pending confirmation nothing can be removed, and the call
    /// fails with [`SnsError::Unknown`].
    async fn unsubscribe_email(
        &self,
        topic_id: &TopicId,
        email_address: &str,
    ) -> Result<Option<SubscriptionId>, SnsError> {
        let subscriptions = self.list_subscriptions_by_topic(topic_id).await?;

        let mut saw_pending = false;
        let found = subscriptions
            .into_iter()
            .filter(|s| s.matches(&Protocol::Email, email_address))
            .find_map(|s| {
                if s.subscription_id.is_none() {
                    saw_pending = true;
                }
                s.subscription_id
            });

        match found {
            Some(subscription_id) => {
                self.unsubscribe(&subscription_id).await?;
                info!(
                    topic_id = %topic_id,
                    subscription_id = %subscription_id,
                    "Email address unsubscribed"
                );
                Ok(Some(subscription_id))
            }
            None if saw_pending => {
                warn!(
                    topic_id = %topic_id,
                    "Email subscription is pending confirmation and cannot be removed yet"
                );
                Err(SnsError::Unknown(format!(
                    "Subscription for {} is pending confirmation",
                    email_address
                )))
            }
            None => {
                debug!(topic_id = %topic_id, "No email subscription to remove");
                Ok(None)
            }
        }
    }
}
