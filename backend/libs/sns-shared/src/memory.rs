//! In-process notification backend
//!
//! Behaves like the subset of SNS this workspace uses, without a network.
//! Used by tests and by the console's offline mode.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;
use uuid::Uuid;

use crate::backend::NotificationBackend;
use crate::error::SnsError;
use crate::models::{EndpointId, Message, Protocol, Subscription, SubscriptionId, TopicId};

pub const DEFAULT_ARN_PREFIX: &str = "arn:aws:sns:us-east-1:000000000000:";
pub const DEFAULT_PLATFORM_APPLICATION_ARN: &str =
    "arn:aws:sns:us-east-1:000000000000:app/GCM/sns-push-console";

/// Data payload queued for a platform endpoint
pub type PushData = BTreeMap<String, String>;

/// Email captured by the in-memory backend instead of being sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub address: String,
    pub subject: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone)]
struct SubscriptionRecord {
    id: SubscriptionId,
    topic_id: TopicId,
    protocol: Protocol,
    endpoint: String,
    confirmed: bool,
}

#[derive(Default)]
struct State {
    topics: BTreeMap<TopicId, String>,
    endpoints: BTreeMap<EndpointId, String>,
    subscriptions: Vec<SubscriptionRecord>,
    deliveries: HashMap<EndpointId, VecDeque<PushData>>,
    sent_emails: Vec<SentEmail>,
    failures: VecDeque<SnsError>,
    calls: u64,
}

pub struct InMemoryBackend {
    platform_application_arn: String,
    arn_prefix: String,
    state: Mutex<State>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_PLATFORM_APPLICATION_ARN)
    }
}

impl InMemoryBackend {
    pub fn new(platform_application_arn: impl Into<String>) -> Self {
        Self {
            platform_application_arn: platform_application_arn.into(),
            arn_prefix: DEFAULT_ARN_PREFIX.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Topic ARNs become `prefix + name`; an empty prefix makes the ARN the name
    pub fn with_arn_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.arn_prefix = prefix.into();
        self
    }

    pub fn platform_application_arn(&self) -> &str {
        &self.platform_application_arn
    }

    /// Fail the next `count` backend calls with `error`
    pub fn fail_next(&self, count: usize, error: SnsError) {
        let mut state = self.state.lock();
        for _ in 0..count {
            state.failures.push_back(error.clone());
        }
    }

    /// Number of backend calls issued so far, failed ones included
    pub fn call_count(&self) -> u64 {
        self.state.lock().calls
    }

    /// Simulate the recipient confirming an email subscription
    ///
    /// Returns false when no matching subscription exists.
    pub fn confirm_subscription(&self, topic_id: &TopicId, endpoint: &str) -> bool {
        let mut state = self.state.lock();
        let mut confirmed = false;
        for record in state
            .subscriptions
            .iter_mut()
            .filter(|r| &r.topic_id == topic_id && r.endpoint == endpoint)
        {
            record.confirmed = true;
            confirmed = true;
        }
        confirmed
    }

    /// Drain payloads delivered to a platform endpoint
    pub fn take_deliveries(&self, endpoint_id: &EndpointId) -> Vec<PushData> {
        self.state
            .lock()
            .deliveries
            .remove(endpoint_id)
            .map(Vec::from)
            .unwrap_or_default()
    }

    pub fn sent_emails(&self) -> Vec<SentEmail> {
        self.state.lock().sent_emails.clone()
    }

    fn begin(&self, state: &mut State) -> Result<(), SnsError> {
        state.calls += 1;
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn endpoint_arn(&self) -> String {
        let id = Uuid::new_v4();
        if self.platform_application_arn.contains(":app/") {
            format!(
                "{}/{}",
                self.platform_application_arn
                    .replacen(":app/", ":endpoint/", 1),
                id
            )
        } else {
            format!("{}endpoint/{}", self.arn_prefix, id)
        }
    }
}

fn not_found(kind: &str, id: &str) -> SnsError {
    SnsError::NotFound(format!("{} does not exist: {}", kind, id))
}

#[async_trait]
impl NotificationBackend for InMemoryBackend {
    async fn create_platform_endpoint(&self, device_token: &str) -> Result<EndpointId, SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;

        if device_token.is_empty() {
            return Err(SnsError::Unknown("Invalid parameter: Token".to_string()));
        }

        if let Some((existing, _)) = state.endpoints.iter().find(|(_, t)| *t == device_token) {
            return Ok(existing.clone());
        }

        let endpoint_id = EndpointId::from(self.endpoint_arn());
        state
            .endpoints
            .insert(endpoint_id.clone(), device_token.to_string());
        debug!(endpoint_id = %endpoint_id, "In-memory endpoint created");
        Ok(endpoint_id)
    }

    async fn delete_endpoint(&self, endpoint_id: &EndpointId) -> Result<(), SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;

        if state.endpoints.remove(endpoint_id).is_none() {
            return Err(not_found("Endpoint", endpoint_id.as_str()));
        }
        state.deliveries.remove(endpoint_id);
        state.subscriptions.retain(|r| {
            !(r.protocol == Protocol::Application && r.endpoint == endpoint_id.as_str())
        });
        Ok(())
    }

    async fn create_topic(&self, name: &str) -> Result<TopicId, SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;

        if name.is_empty() {
            return Err(SnsError::Unknown("Invalid parameter: Topic Name".to_string()));
        }

        let topic_id = TopicId::from(format!("{}{}", self.arn_prefix, name));
        state
            .topics
            .entry(topic_id.clone())
            .or_insert_with(|| name.to_string());
        Ok(topic_id)
    }

    async fn delete_topic(&self, topic_id: &TopicId) -> Result<(), SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;

        if state.topics.remove(topic_id).is_none() {
            return Err(not_found("Topic", topic_id.as_str()));
        }
        state.subscriptions.retain(|r| &r.topic_id != topic_id);
        Ok(())
    }

    async fn subscribe(
        &self,
        topic_id: &TopicId,
        endpoint: &str,
        protocol: Protocol,
    ) -> Result<SubscriptionId, SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;

        if !state.topics.contains_key(topic_id) {
            return Err(not_found("Topic", topic_id.as_str()));
        }
        if protocol == Protocol::Application
            && !state.endpoints.contains_key(&EndpointId::from(endpoint))
        {
            return Err(not_found("Endpoint", endpoint));
        }

        if let Some(existing) = state
            .subscriptions
            .iter()
            .find(|r| &r.topic_id == topic_id && r.protocol == protocol && r.endpoint == endpoint)
        {
            return Ok(existing.id.clone());
        }

        let id = SubscriptionId::from(format!("{}:{}", topic_id, Uuid::new_v4()));
        let confirmed = protocol != Protocol::Email;
        state.subscriptions.push(SubscriptionRecord {
            id: id.clone(),
            topic_id: topic_id.clone(),
            protocol,
            endpoint: endpoint.to_string(),
            confirmed,
        });
        Ok(id)
    }

    async fn unsubscribe(&self, subscription_id: &SubscriptionId) -> Result<(), SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;

        let before = state.subscriptions.len();
        state.subscriptions.retain(|r| &r.id != subscription_id);
        if state.subscriptions.len() == before {
            return Err(not_found("Subscription", subscription_id.as_str()));
        }
        Ok(())
    }

    async fn list_subscriptions_by_topic(
        &self,
        topic_id: &TopicId,
    ) -> Result<Vec<Subscription>, SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;

        if !state.topics.contains_key(topic_id) {
            return Err(not_found("Topic", topic_id.as_str()));
        }

        Ok(state
            .subscriptions
            .iter()
            .filter(|r| &r.topic_id == topic_id)
            .map(|r| Subscription {
                subscription_id: r.confirmed.then(|| r.id.clone()),
                topic_id: r.topic_id.clone(),
                protocol: r.protocol.clone(),
                endpoint: r.endpoint.clone(),
            })
            .collect())
    }

    async fn publish(&self, topic_id: &TopicId, message: &Message) -> Result<(), SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;

        if !state.topics.contains_key(topic_id) {
            return Err(not_found("Topic", topic_id.as_str()));
        }

        let targets: Vec<SubscriptionRecord> = state
            .subscriptions
            .iter()
            .filter(|r| &r.topic_id == topic_id && r.confirmed)
            .cloned()
            .collect();

        for target in targets {
            match target.protocol {
                Protocol::Application => {
                    let mut data = PushData::new();
                    data.insert("default".to_string(), message.body.clone());
                    state
                        .deliveries
                        .entry(EndpointId::from(target.endpoint))
                        .or_default()
                        .push_back(data);
                }
                Protocol::Email => state.sent_emails.push(SentEmail {
                    address: target.endpoint,
                    subject: message.subject.clone(),
                    body: message.body.clone(),
                }),
                Protocol::Other(_) => {}
            }
        }
        Ok(())
    }

    async fn list_topics(&self) -> Result<Vec<TopicId>, SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;
        Ok(state.topics.keys().cloned().collect())
    }

    async fn list_endpoints(&self) -> Result<Vec<EndpointId>, SnsError> {
        let mut state = self.state.lock();
        self.begin(&mut state)?;
        Ok(state.endpoints.keys().cloned().collect())
    }
}
