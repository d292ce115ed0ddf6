use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::ReceiverError;
use crate::models::{LocalNotification, PushPayload, DEFAULT_NOTIFICATION_TITLE};

/// Receives registration token refresh events from the push transport
///
/// The transport calls [`RegistrationListener::on_token_refresh`] whenever a
/// token is first issued or rotated; consumers read the latest value through
/// the paired [`DeviceTokenSource`].
pub struct RegistrationListener {
    tx: watch::Sender<Option<String>>,
}

impl RegistrationListener {
    pub fn new() -> (Self, DeviceTokenSource) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, DeviceTokenSource { rx })
    }

    pub fn on_token_refresh(&self, token: impl Into<String>) {
        let token = token.into();
        debug!(token = %token, "Refreshed registration token");
        self.tx.send_replace(Some(token));
    }
}

/// Read side of the registration token
#[derive(Clone)]
pub struct DeviceTokenSource {
    rx: watch::Receiver<Option<String>>,
}

impl DeviceTokenSource {
    /// A source that always yields `token`
    pub fn fixed(token: impl Into<String>) -> Self {
        let (_tx, rx) = watch::channel(Some(token.into()));
        Self { rx }
    }

    /// The most recent token, if one has been issued
    pub fn current(&self) -> Result<String, ReceiverError> {
        self.rx.borrow().clone().ok_or(ReceiverError::NoToken)
    }

    /// Wait until a token has been issued
    pub async fn wait_for_token(&mut self) -> Result<String, ReceiverError> {
        loop {
            if let Some(token) = self.rx.borrow_and_update().clone() {
                return Ok(token);
            }
            self.rx.changed().await.map_err(|_| ReceiverError::Closed)?;
        }
    }
}

/// Surface that shows local notifications to the user
pub trait NotificationPresenter: Send + Sync {
    fn display(&self, notification: &LocalNotification);
}

impl<T: NotificationPresenter + ?Sized> NotificationPresenter for Arc<T> {
    fn display(&self, notification: &LocalNotification) {
        (**self).display(notification)
    }
}

/// Presenter that writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPresenter;

impl NotificationPresenter for TracingPresenter {
    fn display(&self, notification: &LocalNotification) {
        info!(
            notification_id = notification.id,
            title = %notification.title,
            body = %notification.body,
            "Local notification"
        );
    }
}

/// Turns inbound push payloads into local notifications
pub struct MessageReceiver<P> {
    presenter: P,
    title: String,
}

impl<P: NotificationPresenter> MessageReceiver<P> {
    pub fn new(presenter: P) -> Self {
        Self {
            presenter,
            title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Handle one inbound payload
    ///
    /// Returns the notification that was displayed, or `None` when the
    /// payload carried nothing to show.
    pub fn on_message_received(&self, payload: &PushPayload) -> Option<LocalNotification> {
        if payload.is_empty() {
            return None;
        }

        debug!(data = ?payload.data, "Push message received");

        let Some(body) = payload.message_text() else {
            warn!(
                keys = ?payload.data.keys().collect::<Vec<_>>(),
                "Push payload has neither a message nor a default entry"
            );
            return None;
        };

        let notification = LocalNotification {
            id: notification_id(Utc::now().timestamp()),
            title: self.title.clone(),
            body: body.to_string(),
            auto_cancel: true,
        };

        self.presenter.display(&notification);
        Some(notification)
    }
}

fn notification_id(unix_seconds: i64) -> i32 {
    (unix_seconds.rem_euclid(i32::MAX as i64)) as i32
}
