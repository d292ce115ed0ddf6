use fcm_receiver::ReceiverError;
use sns_shared::SnsError;
use thiserror::Error;

use crate::store::Slot;

/// Identifier storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt storage file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Failure of one background task
#[derive(Error, Debug)]
pub enum TaskError {
    #[error(transparent)]
    Backend(#[from] SnsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Device token unavailable: {0}")]
    DeviceToken(#[from] ReceiverError),

    /// Stored identifier changed underneath the task
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Reason an action was refused before any backend call
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    #[error("{0} is already set")]
    AlreadyPresent(Slot),

    #[error("{0} is not set")]
    Missing(Slot),

    #[error("{0} has an operation in progress")]
    InProgress(Slot),
}

pub type Result<T, E = TaskError> = std::result::Result<T, E>;
