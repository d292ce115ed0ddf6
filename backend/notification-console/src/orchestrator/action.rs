use std::fmt;

use crate::store::Slot;

/// A user-triggered backend operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CreateTopic,
    DeleteTopic,
    SubscribeDevice,
    UnsubscribeDevice,
    SubscribeEmail(String),
    UnsubscribeEmail(String),
    SendMessage,
    DeletePlatformEndpoint,
}

/// How an action relates to the slot it is guarded on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Guard {
    /// Slot must be absent; the action fills it
    Creates(Slot),
    /// Slot must be present; the action clears it
    Deletes(Slot),
    /// Slot must be present; the action only reads it
    Reads(Slot),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateTopic => "create_topic",
            Action::DeleteTopic => "delete_topic",
            Action::SubscribeDevice => "subscribe_device",
            Action::UnsubscribeDevice => "unsubscribe_device",
            Action::SubscribeEmail(_) => "subscribe_email",
            Action::UnsubscribeEmail(_) => "unsubscribe_email",
            Action::SendMessage => "send_message",
            Action::DeletePlatformEndpoint => "delete_platform_endpoint",
        }
    }

    pub(crate) fn guards(&self) -> &'static [Guard] {
        match self {
            Action::CreateTopic => &[Guard::Creates(Slot::Topic)],
            Action::DeleteTopic => &[Guard::Deletes(Slot::Topic)],
            Action::SubscribeDevice => {
                &[Guard::Reads(Slot::Topic), Guard::Creates(Slot::Subscription)]
            }
            Action::UnsubscribeDevice => &[Guard::Deletes(Slot::Subscription)],
            Action::SubscribeEmail(_) | Action::UnsubscribeEmail(_) | Action::SendMessage => {
                &[Guard::Reads(Slot::Topic)]
            }
            Action::DeletePlatformEndpoint => &[Guard::Deletes(Slot::PlatformEndpoint)],
        }
    }

    /// Slots this action may write, marked pending while it runs
    pub(crate) fn writes(&self) -> &'static [Slot] {
        match self {
            Action::CreateTopic => &[Slot::Topic],
            Action::DeleteTopic => &[Slot::Topic, Slot::Subscription],
            Action::SubscribeDevice => &[Slot::Subscription, Slot::PlatformEndpoint],
            Action::UnsubscribeDevice => &[Slot::Subscription],
            Action::DeletePlatformEndpoint => &[Slot::PlatformEndpoint],
            Action::SubscribeEmail(_) | Action::UnsubscribeEmail(_) | Action::SendMessage => &[],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_actions_write_nothing() {
        for action in [
            Action::SubscribeEmail("a@example.com".into()),
            Action::UnsubscribeEmail("a@example.com".into()),
            Action::SendMessage,
        ] {
            assert!(action.writes().is_empty(), "{action}");
            assert_eq!(action.guards(), &[Guard::Reads(Slot::Topic)]);
        }
    }

    #[test]
    fn test_delete_topic_reserves_subscription() {
        assert_eq!(Action::DeleteTopic.writes(), &[Slot::Topic, Slot::Subscription]);
    }

    #[test]
    fn test_subscribe_device_may_fill_endpoint() {
        assert!(Action::SubscribeDevice
            .writes()
            .contains(&Slot::PlatformEndpoint));
    }
}
