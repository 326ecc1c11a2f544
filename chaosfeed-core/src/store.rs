//! Control store contract.
//!
//! The simulation reads and writes two small documents: the session control
//! record and the token quote. Implementations may be remote and may fail;
//! callers log failures and carry on with local state.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;

use crate::domain::{ControlRecord, TokenRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed document at {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read/write access to the shared documents. A missing document is
/// `Ok(None)`, not an error.
pub trait ControlStore: Send {
    fn load_control(&self) -> Result<Option<ControlRecord>, StoreError>;
    fn save_control(&self, record: &ControlRecord) -> Result<(), StoreError>;
    fn load_token(&self) -> Result<Option<TokenRecord>, StoreError>;
    fn save_token(&self, record: &TokenRecord) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
struct Documents {
    control: Option<ControlRecord>,
    token: Option<TokenRecord>,
    unavailable: bool,
    writes: usize,
}

/// In-process store. Clones share the same documents, so a test can keep a
/// handle and play the remote collaborator while a simulation owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Documents>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Successful saves so far.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Current control document, bypassing availability.
    pub fn control(&self) -> Option<ControlRecord> {
        self.lock().control
    }

    pub fn token(&self) -> Option<TokenRecord> {
        self.lock().token
    }

    /// Overwrite the control document as a remote writer would.
    pub fn put_control(&self, record: ControlRecord) {
        self.lock().control = Some(record);
    }

    fn lock(&self) -> MutexGuard<'_, Documents> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn available(&self) -> Result<MutexGuard<'_, Documents>, StoreError> {
        let docs = self.lock();
        if docs.unavailable {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(docs)
    }
}

impl ControlStore for MemoryStore {
    fn load_control(&self) -> Result<Option<ControlRecord>, StoreError> {
        Ok(self.available()?.control)
    }

    fn save_control(&self, record: &ControlRecord) -> Result<(), StoreError> {
        let mut docs = self.available()?;
        docs.control = Some(*record);
        docs.writes += 1;
        Ok(())
    }

    fn load_token(&self) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.available()?.token)
    }

    fn save_token(&self, record: &TokenRecord) -> Result<(), StoreError> {
        let mut docs = self.available()?;
        docs.token = Some(*record);
        docs.writes += 1;
        Ok(())
    }
}
