use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;

/// The three identifiers the console remembers between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Topic,
    Subscription,
    PlatformEndpoint,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Topic, Slot::Subscription, Slot::PlatformEndpoint];

    /// Persisted key name
    pub fn key(&self) -> &'static str {
        match self {
            Slot::Topic => "newTopic",
            Slot::Subscription => "subscriptionARN",
            Slot::PlatformEndpoint => "platformEndpoint",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Small key-value store for slot identifiers
///
/// All writes go through [`SlotStore::compare_and_set`] under one lock, so two
/// tasks can never interleave a read-modify-write on the same slot. When a
/// path is configured the whole map is rewritten through a temp file and a
/// rename after every successful write.
pub struct SlotStore {
    path: Option<PathBuf>,
    slots: Mutex<BTreeMap<String, String>>,
}

impl SlotStore {
    /// Open a file-backed store; a missing file starts empty
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        let slots = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), entries = slots.len(), "Opened identifier store");

        Ok(Self {
            path: Some(path),
            slots: Mutex::new(slots),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            slots: Mutex::new(BTreeMap::new()),
        }
    }

    pub async fn get(&self, slot: Slot) -> Option<String> {
        self.slots.lock().await.get(slot.key()).cloned()
    }

    /// Current value of every slot
    pub async fn snapshot(&self) -> Vec<(Slot, Option<String>)> {
        let slots = self.slots.lock().await;
        Slot::ALL
            .iter()
            .map(|slot| (*slot, slots.get(slot.key()).cloned()))
            .collect()
    }

    /// Replace the value of `slot` with `new` if it still equals `expected`
    ///
    /// Returns `Ok(false)` and leaves the store untouched when the current
    /// value differs. A failed write to disk rolls the change back.
    pub async fn compare_and_set(
        &self,
        slot: Slot,
        expected: Option<&str>,
        new: Option<String>,
    ) -> Result<bool, StoreError> {
        let mut slots = self.slots.lock().await;

        let current = slots.get(slot.key()).map(String::as_str);
        if current != expected {
            warn!(
                slot = %slot,
                expected = ?expected,
                current = ?current,
                "Rejected stale identifier write"
            );
            return Ok(false);
        }

        let previous = match &new {
            Some(value) => slots.insert(slot.key().to_string(), value.clone()),
            None => slots.remove(slot.key()),
        };

        if let Some(path) = &self.path {
            if let Err(e) = persist(path, &slots).await {
                match previous {
                    Some(value) => slots.insert(slot.key().to_string(), value),
                    None => slots.remove(slot.key()),
                };
                return Err(e);
            }
        }

        debug!(slot = %slot, value = ?new, "Stored identifier");
        Ok(true)
    }
}

async fn persist(path: &Path, slots: &BTreeMap<String, String>) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(slots)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
