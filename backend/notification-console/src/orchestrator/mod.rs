//! Runs user actions against the notification backend in background tasks
//!
//! [`Orchestrator::dispatch`] checks an action's guards against the stored
//! identifiers, marks the slots it writes as pending, and spawns one tokio
//! task. Each task reports exactly one [`TaskOutcome`] on the channel returned
//! by [`Orchestrator::new`]; the caller drains it on its own schedule.

mod action;

pub use action::Action;
pub(crate) use action::Guard;

use chrono::Utc;
use fcm_receiver::DeviceTokenSource;
use parking_lot::Mutex;
use sns_shared::{
    EndpointId, Message, NotificationBackend, SnsError, SubscriptionId, TopicId,
};
use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::ConsoleConfig;
use crate::error::{Refusal, Result, TaskError};
use crate::store::{Slot, SlotStore};

const TOPIC_NAME_TIMESTAMP: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Result of one dispatched action
///
/// On success the value is a human-readable detail for the alert, currently
/// only the created topic name.
#[derive(Debug)]
pub struct TaskOutcome {
    pub id: TaskId,
    pub action: Action,
    pub result: Result<Option<String>>,
}

/// Inputs the tasks need besides the backend and the store
#[derive(Debug, Clone)]
pub struct Settings {
    pub topic_prefix: String,
    pub message: Message,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(&ConsoleConfig::default())
    }
}

impl From<&ConsoleConfig> for Settings {
    fn from(config: &ConsoleConfig) -> Self {
        Self {
            topic_prefix: config.topic_prefix.clone(),
            message: Message::new(config.message_body.clone())
                .with_subject(config.message_subject.clone()),
        }
    }
}

pub struct Orchestrator {
    inner: Arc<Inner>,
    next_id: AtomicU64,
}

struct Inner {
    backend: Arc<dyn NotificationBackend>,
    store: Arc<SlotStore>,
    tokens: DeviceTokenSource,
    settings: Settings,
    pending: Mutex<HashSet<Slot>>,
    outcomes: mpsc::UnboundedSender<TaskOutcome>,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn NotificationBackend>,
        store: Arc<SlotStore>,
        tokens: DeviceTokenSource,
        settings: Settings,
    ) -> (Self, mpsc::UnboundedReceiver<TaskOutcome>) {
        let (outcomes, rx) = mpsc::unbounded_channel();

        let orchestrator = Self {
            inner: Arc::new(Inner {
                backend,
                store,
                tokens,
                settings,
                pending: Mutex::new(HashSet::new()),
                outcomes,
            }),
            next_id: AtomicU64::new(1),
        };

        (orchestrator, rx)
    }

    pub fn store(&self) -> &SlotStore {
        &self.inner.store
    }

    pub fn is_pending(&self, slot: Slot) -> bool {
        self.inner.pending.lock().contains(&slot)
    }

    /// Check guards and start `action` in the background
    ///
    /// A refusal is returned directly and no backend call is made.
    pub async fn dispatch(&self, action: Action) -> Result<TaskId, Refusal> {
        let writes = action.writes();

        {
            let mut pending = self.inner.pending.lock();
            let busy = action
                .guards()
                .iter()
                .map(Guard::slot)
                .chain(writes.iter().copied())
                .find(|slot| pending.contains(slot));
            if let Some(slot) = busy {
                warn!(action = %action, slot = %slot, "Action refused, slot is pending");
                return Err(Refusal::InProgress(slot));
            }
            pending.extend(writes.iter().copied());
        }

        // Written slots are now reserved, so their stored values are stable
        if let Err(refusal) = self.inner.check_guards(&action).await {
            self.inner.release(writes);
            warn!(action = %action, reason = %refusal, "Action refused");
            return Err(refusal);
        }

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let inner = Arc::clone(&self.inner);

        info!(task_id = %id, action = %action, "Dispatching action");

        tokio::spawn(async move {
            let result = inner.run(&action).await;
            inner.release(action.writes());

            match &result {
                Ok(_) => info!(task_id = %id, action = %action, "Action completed"),
                Err(e) => error!(task_id = %id, action = %action, error = %e, "Action failed"),
            }

            if inner.outcomes.send(TaskOutcome { id, action, result }).is_err() {
                warn!(task_id = %id, "Outcome receiver dropped");
            }
        });

        Ok(id)
    }
}

impl Guard {
    pub(crate) fn slot(&self) -> Slot {
        match *self {
            Guard::Creates(slot) | Guard::Deletes(slot) | Guard::Reads(slot) => slot,
        }
    }
}

impl Inner {
    fn release(&self, slots: &[Slot]) {
        let mut pending = self.pending.lock();
        for slot in slots {
            pending.remove(slot);
        }
    }

    async fn check_guards(&self, action: &Action) -> Result<(), Refusal> {
        for guard in action.guards() {
            let present = self.store.get(guard.slot()).await.is_some();
            match (*guard, present) {
                (Guard::Creates(slot), true) => return Err(Refusal::AlreadyPresent(slot)),
                (Guard::Deletes(slot) | Guard::Reads(slot), false) => {
                    return Err(Refusal::Missing(slot))
                }
                _ => {}
            }
        }
        Ok(())
    }

    async fn run(&self, action: &Action) -> Result<Option<String>> {
        let backend = &self.backend;

        match action {
            Action::CreateTopic => {
                let name = format!(
                    "{}{}",
                    self.settings.topic_prefix,
                    Utc::now().format(TOPIC_NAME_TIMESTAMP)
                );
                let topic_id = backend.create_topic(&name).await?;
                self.store_value(action, Slot::Topic, None, Some(topic_id.into_inner()))
                    .await?;
                Ok(Some(name))
            }
            Action::DeleteTopic => {
                let topic = self.require(Slot::Topic).await?;
                backend.delete_topic(&TopicId::new(topic.as_str())).await?;
                self.store_value(action, Slot::Topic, Some(&topic), None).await?;

                // The backend drops the topic's subscriptions along with it
                if let Some(subscription) = self.store.get(Slot::Subscription).await {
                    self.store_value(action, Slot::Subscription, Some(&subscription), None)
                        .await?;
                }
                Ok(None)
            }
            Action::SubscribeDevice => {
                let topic_id = TopicId::new(self.require(Slot::Topic).await?);
                let endpoint_id = self.platform_endpoint(action).await?;
                let subscription_id = backend.subscribe_device(&topic_id, &endpoint_id).await?;
                self.store_value(
                    action,
                    Slot::Subscription,
                    None,
                    Some(subscription_id.into_inner()),
                )
                .await?;
                Ok(None)
            }
            Action::UnsubscribeDevice => {
                let subscription = self.require(Slot::Subscription).await?;
                match backend
                    .unsubscribe(&SubscriptionId::new(subscription.as_str()))
                    .await
                {
                    Ok(()) => {}
                    Err(SnsError::NotFound(message)) => {
                        warn!(
                            subscription_id = %subscription,
                            reason = %message,
                            "Subscription already removed by the backend, clearing stored id"
                        );
                    }
                    Err(e) => return Err(e.into()),
                }
                self.store_value(action, Slot::Subscription, Some(&subscription), None)
                    .await?;
                Ok(None)
            }
            Action::SubscribeEmail(address) => {
                let topic_id = TopicId::new(self.require(Slot::Topic).await?);
                backend.subscribe_email(&topic_id, address).await?;
                Ok(None)
            }
            Action::UnsubscribeEmail(address) => {
                let topic_id = TopicId::new(self.require(Slot::Topic).await?);
                // No matching subscription is reported as success
                backend.unsubscribe_email(&topic_id, address).await?;
                Ok(None)
            }
            Action::SendMessage => {
                let topic_id = TopicId::new(self.require(Slot::Topic).await?);
                backend.publish(&topic_id, &self.settings.message).await?;
                Ok(None)
            }
            Action::DeletePlatformEndpoint => {
                let endpoint = self.require(Slot::PlatformEndpoint).await?;
                backend
                    .delete_endpoint(&EndpointId::new(endpoint.as_str()))
                    .await?;
                self.store_value(action, Slot::PlatformEndpoint, Some(&endpoint), None)
                    .await?;
                Ok(None)
            }
        }
    }

    /// Stored endpoint, or a new one registered from the current device token
    async fn platform_endpoint(&self, action: &Action) -> Result<EndpointId> {
        if let Some(endpoint) = self.store.get(Slot::PlatformEndpoint).await {
            return Ok(EndpointId::new(endpoint));
        }

        let token = self.tokens.current()?;
        let endpoint_id = self.backend.create_platform_endpoint(&token).await?;
        self.store_value(
            action,
            Slot::PlatformEndpoint,
            None,
            Some(endpoint_id.as_str().to_string()),
        )
        .await?;
        Ok(endpoint_id)
    }

    async fn require(&self, slot: Slot) -> Result<String> {
        self.store
            .get(slot)
            .await
            .ok_or_else(|| TaskError::Conflict(format!("{slot} was cleared by another task")))
    }

    async fn store_value(
        &self,
        action: &Action,
        slot: Slot,
        expected: Option<&str>,
        new: Option<String>,
    ) -> Result<()> {
        if self.store.compare_and_set(slot, expected, new).await? {
            Ok(())
        } else {
            Err(TaskError::Conflict(format!(
                "{slot} changed while {action} was running"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sns_shared::InMemoryBackend;

    fn orchestrator() -> (Orchestrator, mpsc::UnboundedReceiver<TaskOutcome>) {
        Orchestrator::new(
            Arc::new(InMemoryBackend::default()),
            Arc::new(SlotStore::in_memory()),
            DeviceTokenSource::fixed("device-token"),
            Settings::default(),
        )
    }

    #[test]
    fn test_settings_from_config() {
        let settings = Settings::default();
        assert_eq!(settings.topic_prefix, "AmazonSNSTest");
        assert_eq!(settings.message.body, "Test message");
        assert_eq!(settings.message.subject.as_deref(), Some("Amazon SNS Test"));
    }

    #[tokio::test]
    async fn test_create_topic_name_has_timestamp() {
        let (orchestrator, mut outcomes) = orchestrator();

        orchestrator.dispatch(Action::CreateTopic).await.unwrap();
        let outcome = outcomes.recv().await.unwrap();

        let name = outcome.result.unwrap().unwrap();
        let stamp = name.strip_prefix("AmazonSNSTest").unwrap();
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_pending_cleared_after_outcome() {
        let (orchestrator, mut outcomes) = orchestrator();

        orchestrator.dispatch(Action::CreateTopic).await.unwrap();
        assert!(orchestrator.is_pending(Slot::Topic));

        outcomes.recv().await.unwrap();
        assert!(!orchestrator.is_pending(Slot::Topic));
    }
}
