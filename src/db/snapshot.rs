// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Whole-file JSON snapshots with atomic replace.
//!
//! A snapshot is written to `<path>.tmp`, synced, then renamed over `<path>`,
//! so the file on disk is always either the previous complete snapshot or the
//! new one.

use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Snapshot I/O errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} does not contain a valid snapshot: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Snapshot writer task failed: {0}")]
    Join(String),
}

/// Path of the temporary file used while replacing `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Read a snapshot; a missing file yields `T::default()`.
pub fn read_blocking<T: DeserializeOwned + Default>(path: &Path) -> Result<T, SnapshotError> {
    match fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Corrupt {
            path: path.to_path_buf(),
            source,
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(T::default()),
        Err(source) => Err(SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Atomically replace `path` with `bytes`.
pub fn write_blocking(path: &Path, bytes: &[u8]) -> Result<(), SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp = temp_path(path);
    {
        let mut file = fs::File::create(&tmp).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
    }
    fs::rename(&tmp, path).map_err(io_err)
}

/// Async wrapper around [`read_blocking`].
pub async fn read<T>(path: &Path) -> Result<T, SnapshotError>
where
    T: DeserializeOwned + Default + Send + 'static,
{
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_blocking(&path))
        .await
        .map_err(|e| SnapshotError::Join(e.to_string()))?
}

/// Async wrapper around [`write_blocking`].
pub async fn write(path: &Path, bytes: Vec<u8>) -> Result<(), SnapshotError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || write_blocking(&path, &bytes))
        .await
        .map_err(|e| SnapshotError::Join(e.to_string()))?
}
