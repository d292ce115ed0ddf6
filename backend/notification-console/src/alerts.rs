use fcm_receiver::{LocalNotification, NotificationPresenter};
use std::fmt;
use std::io::{self, Write};
use tracing::warn;

use crate::error::Refusal;
use crate::orchestrator::{Action, TaskOutcome};
use crate::store::Slot;

const FAILURE_TITLE: &str = "Alert";

/// A modal message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    /// Alert for a finished task
    pub fn for_outcome(outcome: &TaskOutcome) -> Self {
        match &outcome.result {
            Ok(detail) => success(&outcome.action, detail.as_deref()),
            Err(_) => failure(&outcome.action),
        }
    }

    /// Alert for an action refused by its guard
    pub fn for_refusal(action: &Action, refusal: &Refusal) -> Self {
        match (action, refusal) {
            (Action::CreateTopic, Refusal::AlreadyPresent(_)) => Alert::new(
                "Topic already created",
                "A new topic has already been created with this device. Please delete it and before creating a new one.",
            ),
            (Action::DeleteTopic, Refusal::Missing(_)) => Alert::new(
                "Topic not found",
                "Could not find a topic to delete. One may not have been made with this device. Please create one and try again.",
            ),
            (_, Refusal::Missing(Slot::Topic)) => Alert::new(
                "Topic not found",
                "Could not find a topic. One may not have been made with this device. Please create one and try again.",
            ),
            (_, Refusal::AlreadyPresent(Slot::Subscription)) => Alert::new(
                "Device already subscribed",
                "This device is already subscribed to the topic. Please unsubscribe it before subscribing again.",
            ),
            (_, Refusal::Missing(Slot::Subscription)) => Alert::new(
                "Subscription not found",
                "Could not get the subscription for this device. It may not be subscribed.",
            ),
            (_, Refusal::Missing(Slot::PlatformEndpoint)) => Alert::new(
                "Endpoint not found",
                "Could not find the application's endpoint to delete.",
            ),
            (_, Refusal::InProgress(_)) => Alert::new(
                "Operation in progress",
                "A previous request for this item is still running. Please wait for it to finish.",
            ),
            (_, refusal) => Alert::new(FAILURE_TITLE, refusal.to_string()),
        }
    }
}

fn success(action: &Action, detail: Option<&str>) -> Alert {
    match action {
        Action::CreateTopic => Alert::new(
            "Topic created",
            format!(
                "The following topic was created successfully: {}",
                detail.unwrap_or_default()
            ),
        ),
        Action::DeleteTopic => Alert::new("Topic deleted", "Topic deleted successfully"),
        Action::SubscribeDevice => Alert::new(
            "Push Notification Subscription Successful",
            "You will now receive push notifications.",
        ),
        Action::UnsubscribeDevice => Alert::new(
            "Push Notification Unsubscription Successful",
            "You will no longer receive push notifications.",
        ),
        Action::SubscribeEmail(_) => Alert::new(
            "Email Notification Subscription Successful",
            "You will now receive a subscription confirmation email. After you confirm the subscription, you will be able to receive notification emails.",
        ),
        Action::UnsubscribeEmail(_) => Alert::new(
            "Email Notification Unsubscription Successful",
            "You will no longer receive email notifications.",
        ),
        Action::SendMessage => Alert::new("Message Sent", "Message sent successfully"),
        Action::DeletePlatformEndpoint => {
            Alert::new("Endpoint deleted", "Endpoint deleted successfully")
        }
    }
}

fn failure(action: &Action) -> Alert {
    let message = match action {
        Action::CreateTopic => "Error when creating the topic",
        Action::DeleteTopic => "Error when deleting the topic",
        Action::SubscribeDevice | Action::SubscribeEmail(_) => {
            "Unable to subscribe to notifications"
        }
        Action::UnsubscribeDevice => "Unable to unsubscribe from notifications",
        Action::UnsubscribeEmail(_) => "Unable to unsubscribe from email notifications",
        Action::SendMessage => "Error when sending the message",
        Action::DeletePlatformEndpoint => "Error when deleting the endpoint",
    };
    Alert::new(FAILURE_TITLE, message)
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Surface that shows alerts to the user
pub trait AlertPresenter: Send + Sync {
    fn show_alert(&self, alert: &Alert);
}

/// Prints each alert as a framed block on stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePresenter;

impl ConsolePresenter {
    fn render(alert: &Alert) -> String {
        let width = alert.title.len().max(alert.message.len()).min(76);
        let rule = "-".repeat(width + 4);
        format!(
            "+{rule}+\n|  {title}\n|\n|  {message}\n+{rule}+",
            title = alert.title,
            message = alert.message,
        )
    }

    fn write_alert(out: &mut impl Write, alert: &Alert) -> io::Result<()> {
        writeln!(out, "{}", Self::render(alert))?;
        out.flush()
    }
}

impl AlertPresenter for ConsolePresenter {
    fn show_alert(&self, alert: &Alert) {
        let mut out = io::stdout().lock();
        if let Err(e) = Self::write_alert(&mut out, alert) {
            warn!(error = %e, title = %alert.title, "Failed to write alert to stdout");
        }
    }
}

impl NotificationPresenter for ConsolePresenter {
    fn display(&self, notification: &LocalNotification) {
        self.show_alert(&Alert::new(&notification.title, &notification.body));
    }
}
