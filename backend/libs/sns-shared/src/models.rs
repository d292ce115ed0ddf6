use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

opaque_id!(
    /// Topic ARN
    TopicId
);
opaque_id!(
    /// Platform endpoint ARN (one device registration)
    EndpointId
);
opaque_id!(
    /// Subscription ARN
    SubscriptionId
);

/// Delivery protocol of a subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    Email,
    Application,
    /// Any protocol this crate does not subscribe with (sms, sqs, ...)
    Other(String),
}

impl Protocol {
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Email => "email",
            Protocol::Application => "application",
            Protocol::Other(s) => s,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Protocol {
    fn from(s: &str) -> Self {
        match s {
            "email" => Protocol::Email,
            "application" => Protocol::Application,
            other => Protocol::Other(other.to_string()),
        }
    }
}

impl FromStr for Protocol {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Protocol::from(s))
    }
}

/// One entry of a topic's subscription list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// `None` while the backend reports the subscription as pending confirmation
    pub subscription_id: Option<SubscriptionId>,
    pub topic_id: TopicId,
    pub protocol: Protocol,
    pub endpoint: String,
}

impl Subscription {
    pub fn is_pending(&self) -> bool {
        self.subscription_id.is_none()
    }

    pub fn matches(&self, protocol: &Protocol, endpoint: &str) -> bool {
        &self.protocol == protocol && self.endpoint == endpoint
    }
}

/// Message published to a topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub body: String,
    /// Used as the email subject line; ignored by push endpoints
    pub subject: Option<String>,
}

impl Message {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}
