use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::adapters::persistence::{PersistenceError, lock_writer};
use crate::domain::models::{DeviceRegistration, timestamp_to_iso8601};
use crate::domain::status_tracker::{Clock, SystemClock};

pub type Registrations = BTreeMap<String, DeviceRegistration>;

/// JSON file keyed by device token. Load-modify-save runs under one lock.
pub struct DeviceRegistry<Cl = SystemClock> {
    path: PathBuf,
    clock: Cl,
    write_lock: Mutex<()>,
}

impl DeviceRegistry<SystemClock> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, SystemClock)
    }
}

impl<Cl: Clock> DeviceRegistry<Cl> {
    pub fn with_clock(path: impl Into<PathBuf>, clock: Cl) -> Self {
        Self {
            path: path.into(),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn register(&self, token: &str) -> Result<DeviceRegistration, PersistenceError> {
        let _guard = lock_writer(&self.write_lock, "device registry")?;
        let mut registrations = self.load()?;
        let now = timestamp_to_iso8601(self.clock.now());

        let registration = registrations
            .entry(token.to_string())
            .and_modify(|existing| existing.last_updated = now.clone())
            .or_insert_with(|| DeviceRegistration {
                token: token.to_string(),
                registered_at: now.clone(),
                last_updated: now.clone(),
            })
            .clone();

        self.save(&registrations)?;
        Ok(registration)
    }

    pub fn tokens(&self) -> Result<Vec<String>, PersistenceError> {
        let _guard = lock_writer(&self.write_lock, "device registry")?;
        Ok(self.load()?.into_keys().collect())
    }

    pub fn load(&self) -> Result<Registrations, PersistenceError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Registrations::new());
            }
            Err(source) => return Err(self.io_error(source)),
        };

        if content.trim().is_empty() {
            return Ok(Registrations::new());
        }

        serde_json::from_str(&content).map_err(|source| PersistenceError::Json {
            path: self.display_path(),
            source,
        })
    }

    fn save(&self, registrations: &Registrations) -> Result<(), PersistenceError> {
        let content =
            serde_json::to_string_pretty(registrations).map_err(|source| PersistenceError::Json {
                path: self.display_path(),
                source,
            })?;

        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, content).map_err(|source| self.io_error(source))?;
        std::fs::rename(&staging, &self.path).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.display_path(),
            source,
        }
    }

    fn display_path(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}
