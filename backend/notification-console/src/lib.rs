pub mod alerts;
pub mod commands;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod store;

pub use alerts::{Alert, AlertPresenter, ConsolePresenter};
pub use commands::Command;
pub use config::{BackendKind, Config, ConsoleConfig};
pub use error::{Refusal, Result, StoreError, TaskError};
pub use orchestrator::{Action, Orchestrator, Settings, TaskId, TaskOutcome};
pub use store::{Slot, SlotStore};
