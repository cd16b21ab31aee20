use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::domain::Appointment;
use tokio::fs;
use tracing::info;

use crate::StoreError;

/// Everything the server needs to resume: the records and the id counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub next_id: u64,
    pub appointments: Vec<Appointment>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            next_id: 1,
            appointments: Vec::new(),
        }
    }
}

impl Snapshot {
    /// Raises `next_id` above every stored id, so a counter that went
    /// missing or backwards can never hand out an id twice. A stored id
    /// with no successor leaves nothing to hand out.
    pub fn normalized(mut self) -> Result<Self, StoreError> {
        let mut floor = 1;
        for appointment in &self.appointments {
            let next = appointment
                .id
                .0
                .checked_add(1)
                .ok_or(StoreError::IdsExhausted)?;
            floor = floor.max(next);
        }
        self.next_id = self.next_id.max(floor);
        Ok(self)
    }
}

impl TryFrom<Vec<Appointment>> for Snapshot {
    type Error = StoreError;

    fn try_from(appointments: Vec<Appointment>) -> Result<Self, StoreError> {
        Self {
            next_id: 1,
            appointments,
        }
        .normalized()
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OnDisk {
            Current {
                next_id: u64,
                appointments: Vec<Appointment>,
            },
            Bare(Vec<Appointment>),
        }

        let snapshot = match OnDisk::deserialize(deserializer)? {
            OnDisk::Current {
                next_id,
                appointments,
            } => Snapshot {
                next_id,
                appointments,
            }
            .normalized(),
            OnDisk::Bare(appointments) => Snapshot::try_from(appointments),
        };
        snapshot.map_err(serde::de::Error::custom)
    }
}

#[async_trait]
pub trait DurableStore: Send + Sync {
    /// A missing source is an empty snapshot, not an error.
    async fn load(&self) -> Result<Snapshot>;
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// Pretty-printed JSON file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl DurableStore for JsonFileStore {
    async fn load(&self) -> Result<Snapshot> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "data file not found; a new one will be created");
                return Ok(Snapshot::default());
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to read '{}'", self.path.display()))
            }
        };

        serde_json::from_slice(&raw)
            .with_context(|| format!("'{}' is not a valid appointment file", self.path.display()))
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("failed to create parent directory '{}'", parent.display())
            })?;
        }

        let body = serde_json::to_vec_pretty(snapshot)?;
        let staging = self.staging_path();
        fs::write(&staging, body)
            .await
            .with_context(|| format!("failed to write '{}'", staging.display()))?;
        fs::rename(&staging, &self.path).await.with_context(|| {
            format!(
                "failed to move '{}' into place at '{}'",
                staging.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }
}

/// In-process store for tests and throwaway servers. Can be told to fail
/// loads or saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Snapshot>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
    fail_load: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    /// Every `load` fails, as a corrupt file would.
    pub fn unreadable() -> Self {
        Self {
            fail_load: true,
            ..Self::default()
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of save attempts, failed ones included.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> Snapshot {
        match self.snapshot.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn load(&self) -> Result<Snapshot> {
        if self.fail_load {
            return Err(anyhow!("memory store marked unreadable"));
        }
        Ok(self.snapshot())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(anyhow!("memory store rejected save"));
        }
        let mut guard = self
            .snapshot
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        *guard = snapshot.clone();
        Ok(())
    }
}
