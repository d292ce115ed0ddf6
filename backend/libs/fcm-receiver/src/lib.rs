/// FCM Receiver Library
///
/// Device-side half of push delivery for the SNS console.
///
/// It handles:
/// - Registration token refresh events and access to the current token
/// - Inbound push payloads (`message` key, falling back to `default`)
/// - Raising local notifications through a pluggable presenter

pub mod errors;
pub mod models;
pub mod receiver;

pub use errors::ReceiverError;
pub use models::{LocalNotification, PushPayload, DEFAULT_NOTIFICATION_TITLE};
pub use receiver::{
    DeviceTokenSource, MessageReceiver, NotificationPresenter, RegistrationListener,
    TracingPresenter,
};
