//! Backend contract tests against the in-memory implementation
//!
//! These exercise the trait object exactly the way the console does, and
//! verify results through the listing operations with bounded polling.

use sns_shared::{
    wait_until, EndpointId, InMemoryBackend, Message, NotificationBackend, Protocol, SnsError,
    TopicId,
};
use std::sync::Arc;
use std::time::Duration;

const TEST_TOPIC_NAME: &str = "createTopicTest";
const TIMEOUT: Duration = Duration::from_secs(2);
const INTERVAL: Duration = Duration::from_millis(10);

fn backend() -> (Arc<InMemoryBackend>, Arc<dyn NotificationBackend>) {
    let concrete = Arc::new(InMemoryBackend::default());
    let dynamic: Arc<dyn NotificationBackend> = concrete.clone();
    (concrete, dynamic)
}

async fn topic_listed(backend: &Arc<dyn NotificationBackend>, topic: &TopicId) -> bool {
    backend
        .list_topics()
        .await
        .map(|topics| topics.contains(topic))
        .unwrap_or(false)
}

async fn subscription_listed(
    backend: &Arc<dyn NotificationBackend>,
    topic: &TopicId,
    protocol: &Protocol,
    endpoint: &str,
) -> bool {
    backend
        .list_subscriptions_by_topic(topic)
        .await
        .map(|subs| subs.iter().any(|s| s.matches(protocol, endpoint)))
        .unwrap_or(false)
}

#[tokio::test]
async fn test_created_endpoint_appears_in_listing() {
    let (_, backend) = backend();

    let endpoint = backend
        .create_platform_endpoint("fcm-registration-token")
        .await
        .expect("endpoint creation failed");

    let listed = wait_until(TIMEOUT, INTERVAL, || {
        let backend = backend.clone();
        let endpoint = endpoint.clone();
        async move {
            backend
                .list_endpoints()
                .await
                .map(|all| all.contains(&endpoint))
                .unwrap_or(false)
        }
    })
    .await;
    assert!(listed, "endpoint {} never appeared in listing", endpoint);
}

#[tokio::test]
async fn test_create_topic_matches_concatenated_fixture() {
    let backend: Arc<dyn NotificationBackend> =
        Arc::new(InMemoryBackend::default().with_arn_prefix(""));

    let topic = backend.create_topic(TEST_TOPIC_NAME).await.unwrap();
    assert_eq!(topic, TopicId::from(TEST_TOPIC_NAME));

    let listed = wait_until(TIMEOUT, INTERVAL, || {
        let backend = backend.clone();
        let topic = topic.clone();
        async move { topic_listed(&backend, &topic).await }
    })
    .await;
    assert!(listed);
}

#[tokio::test]
async fn test_create_topic_twice_returns_same_arn() {
    let (_, backend) = backend();
    let first = backend.create_topic(TEST_TOPIC_NAME).await.unwrap();
    let second = backend.create_topic(TEST_TOPIC_NAME).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_application_subscribe_then_unsubscribe() {
    let (_, backend) = backend();
    let topic = backend.create_topic(TEST_TOPIC_NAME).await.unwrap();
    let endpoint = backend.create_platform_endpoint("token").await.unwrap();

    let subscription = backend.subscribe_device(&topic, &endpoint).await.unwrap();
    assert!(
        subscription_listed(&backend, &topic, &Protocol::Application, endpoint.as_str()).await
    );

    backend.unsubscribe(&subscription).await.unwrap();

    let removed = wait_until(TIMEOUT, INTERVAL, || {
        let backend = backend.clone();
        let topic = topic.clone();
        let endpoint = endpoint.clone();
        async move {
            !subscription_listed(&backend, &topic, &Protocol::Application, endpoint.as_str())
                .await
        }
    })
    .await;
    assert!(removed);
}

#[tokio::test]
async fn test_email_subscribe_then_unsubscribe() {
    let (concrete, backend) = backend();
    let email = "subscriber@example.com";
    let topic = backend.create_topic(TEST_TOPIC_NAME).await.unwrap();

    backend.subscribe_email(&topic, email).await.unwrap();
    assert!(subscription_listed(&backend, &topic, &Protocol::Email, email).await);

    // pending subscriptions cannot be removed, and the caller is told so
    let err = backend.unsubscribe_email(&topic, email).await.unwrap_err();
    assert!(matches!(err, SnsError::Unknown(_)), "{err:?}");
    assert!(subscription_listed(&backend, &topic, &Protocol::Email, email).await);

    assert!(concrete.confirm_subscription(&topic, email));
    let removed = backend.unsubscribe_email(&topic, email).await.unwrap();
    assert!(removed.is_some());

    let gone = wait_until(TIMEOUT, INTERVAL, || {
        let backend = backend.clone();
        let topic = topic.clone();
        async move { !subscription_listed(&backend, &topic, &Protocol::Email, email).await }
    })
    .await;
    assert!(gone);
}

#[tokio::test]
async fn test_email_unsubscribe_without_subscription_is_noop() {
    let (concrete, backend) = backend();
    let topic = backend.create_topic(TEST_TOPIC_NAME).await.unwrap();

    let result = backend
        .unsubscribe_email(&topic, "nobody@example.com")
        .await
        .expect("unsubscribing an unknown address must not fail");
    assert_eq!(result, None);
    // one create + one list; no unsubscribe issued
    assert_eq!(concrete.call_count(), 2);
}

#[tokio::test]
async fn test_email_unsubscribe_only_touches_matching_protocol() {
    let (concrete, backend) = backend();
    let topic = backend.create_topic(TEST_TOPIC_NAME).await.unwrap();
    let endpoint = backend.create_platform_endpoint("token").await.unwrap();
    backend.subscribe_device(&topic, &endpoint).await.unwrap();
    backend.subscribe_email(&topic, "a@example.com").await.unwrap();
    concrete.confirm_subscription(&topic, "a@example.com");

    backend
        .unsubscribe_email(&topic, endpoint.as_str())
        .await
        .unwrap();

    assert!(
        subscription_listed(&backend, &topic, &Protocol::Application, endpoint.as_str()).await
    );
    assert!(subscription_listed(&backend, &topic, &Protocol::Email, "a@example.com").await);
}

#[tokio::test]
async fn test_deleting_unknown_resources_fails() {
    let (_, backend) = backend();

    let topic_err = backend
        .delete_topic(&TopicId::from("arn:aws:sns:us-east-1:000000000000:missing"))
        .await
        .unwrap_err();
    assert!(matches!(topic_err, SnsError::NotFound(_)));

    let endpoint_err = backend
        .delete_endpoint(&EndpointId::from("arn:aws:sns:us-east-1:000000000000:endpoint/x"))
        .await
        .unwrap_err();
    assert!(matches!(endpoint_err, SnsError::NotFound(_)));
}

#[tokio::test]
async fn test_publish_delivers_default_key_to_subscribed_endpoint() {
    let (concrete, backend) = backend();
    let topic = backend.create_topic(TEST_TOPIC_NAME).await.unwrap();
    let endpoint = backend.create_platform_endpoint("token").await.unwrap();
    backend.subscribe_device(&topic, &endpoint).await.unwrap();

    backend
        .publish(&topic, &Message::new("message").with_subject("subject"))
        .await
        .unwrap();

    let deliveries = concrete.take_deliveries(&endpoint);
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].get("default").map(String::as_str), Some("message"));
    assert!(deliveries[0].get("message").is_none());

    assert!(concrete.take_deliveries(&endpoint).is_empty());
}

#[tokio::test]
async fn test_publish_to_deleted_topic_fails() {
    let (_, backend) = backend();
    let topic = backend.create_topic(TEST_TOPIC_NAME).await.unwrap();
    backend.delete_topic(&topic).await.unwrap();

    let err = backend
        .publish(&topic, &Message::new("late"))
        .await
        .unwrap_err();
    assert!(matches!(err, SnsError::NotFound(_)));
}
