//! File-backed control store.
//!
//! One pretty-printed JSON document per record under a directory:
//! `control.json` and `token.json`. A missing file reads as "no record".
//! Writes go through a temporary file and a rename so a concurrent reader
//! never observes a half-written document.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use chaosfeed_core::domain::{ControlRecord, TokenRecord};
use chaosfeed_core::{ControlStore, StoreError};

pub const CONTROL_FILE: &str = "control.json";
pub const TOKEN_FILE: &str = "token.json";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StoreError> {
        let path = self.dir.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Malformed { path, source })
    }

    fn write<T: Serialize>(&self, name: &str, record: &T) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let json = serde_json::to_vec_pretty(record).map_err(|source| StoreError::Malformed {
            path: path.clone(),
            source,
        })?;
        let tmp = self.dir.join(format!(".{name}.tmp"));
        fs::write(&tmp, json)
            .and_then(|()| fs::rename(&tmp, &path))
            .map_err(|source| StoreError::Io { path, source })
    }
}

impl ControlStore for JsonFileStore {
    fn load_control(&self) -> Result<Option<ControlRecord>, StoreError> {
        self.read(CONTROL_FILE)
    }

    fn save_control(&self, record: &ControlRecord) -> Result<(), StoreError> {
        self.write(CONTROL_FILE, record)
    }

    fn load_token(&self) -> Result<Option<TokenRecord>, StoreError> {
        self.read(TOKEN_FILE)
    }

    fn save_token(&self, record: &TokenRecord) -> Result<(), StoreError> {
        self.write(TOKEN_FILE, record)
    }
}
