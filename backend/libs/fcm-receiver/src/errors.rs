use thiserror::Error;

/// Push receiver error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReceiverError {
    #[error("Invalid push payload: {0}")]
    InvalidPayload(String),

    #[error("No device registration token has been issued yet")]
    NoToken,

    #[error("Registration listener has shut down")]
    Closed,
}

