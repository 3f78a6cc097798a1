use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("file operation on {path} failed: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid device registry json in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}

pub(crate) fn lock_writer<'a>(
    lock: &'a Mutex<()>,
    name: &'static str,
) -> Result<MutexGuard<'a, ()>, PersistenceError> {
    lock.lock().map_err(|_| PersistenceError::LockPoisoned(name))
}
