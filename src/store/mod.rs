// Copyright 2025 bakri (tidynest@proton.me)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! File access to the module directory
//!
//! [`ModuleStore`] is the only way the rest of the crate touches module
//! files. Two implementations exist:
//! - [`RootModuleStore`]: every operation is a command on the privileged shell
//! - [`LocalModuleStore`]: direct filesystem access, for a mounted module
//!   directory and for tests
//!
//! # Safety Modes
//!
//! [`ModeGuard`] wraps any store and gates modifications:
//! - **DryRun**: Writes are logged and skipped
//! - **ReadOnly**: Writes are rejected with an error
//! - **Live**: Full access
//!
//! # Example
//! ```
//! use kctrl_config::store::{AccessMode, LocalModuleStore, ModeGuard, ModuleStore};
//! use std::{path::Path, sync::Arc};
//!
//! let store = ModeGuard::new(Arc::new(LocalModuleStore::new()), AccessMode::ReadOnly);
//! assert!(store.write_file(Path::new("/tmp/config.txt"), b"enable_log=1\n").is_err());
//! ```

pub mod local;
pub mod root;

pub use local::LocalModuleStore;
pub use root::RootModuleStore;

use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use thiserror::Error;

use crate::shell::ShellError;

/// Errors raised by a [`ModuleStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path cannot be passed to the shell as UTF-8
    #[error("Unsupported path: {0}")]
    InvalidPath(PathBuf),

    /// File content is not UTF-8 where text was expected
    #[error("File is not valid UTF-8: {0}")]
    InvalidEncoding(PathBuf),

    /// Shell transport returned data that does not decode
    #[error("Corrupt transfer of {path}: {message}")]
    Transfer { path: PathBuf, message: String },

    /// Modification attempted in read-only mode
    #[error("Store is read-only, refusing to {0}")]
    ReadOnly(String),
}

/// Operation mode of a [`ModeGuard`].
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum AccessMode {
    /// Log modifications, never perform them
    DryRun,

    /// Reject modifications
    ReadOnly,

    /// Full access
    #[default]
    Live,
}

impl AccessMode {
    /// Decides whether a modification described by `action` may run.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Live mode, perform the action
    /// * `Ok(false)` - Dry run, skip the action and report success
    /// * `Err(StoreError::ReadOnly)` - Read-only mode
    pub fn permits(&self, action: &str) -> Result<bool, StoreError> {
        match self {
            AccessMode::Live => Ok(true),
            AccessMode::DryRun => {
                tracing::info!("[dry run] would {}", action);
                Ok(false)
            }
            AccessMode::ReadOnly => Err(StoreError::ReadOnly(action.to_string())),
        }
    }
}

impl FromStr for AccessMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dry-run" => Ok(AccessMode::DryRun),
            "read-only" => Ok(AccessMode::ReadOnly),
            "live" => Ok(AccessMode::Live),
            other => Err(format!("unknown access mode '{}'", other)),
        }
    }
}

/// File operations on the module directory. All paths are absolute.
pub trait ModuleStore: Send + Sync {
    /// Reads a file, `None` if it does not exist.
    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replaces a file, creating parent directories as needed.
    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError>;

    /// Removes a file. Missing files are not an error.
    fn remove_file(&self, path: &Path) -> Result<(), StoreError>;

    fn exists(&self, path: &Path) -> Result<bool, StoreError>;

    /// Regular files below `dir`, recursively and sorted. Empty for a missing directory.
    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError>;

    fn set_executable(&self, path: &Path) -> Result<(), StoreError>;

    /// Reads a file as UTF-8 text.
    fn read_text(&self, path: &Path) -> Result<Option<String>, StoreError> {
        match self.read_file(path)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StoreError::InvalidEncoding(path.to_path_buf())),
            None => Ok(None),
        }
    }
}

/// Store decorator enforcing an [`AccessMode`].
pub struct ModeGuard {
    inner: Arc<dyn ModuleStore>,
    mode: AccessMode,
}

impl ModeGuard {
    pub fn new(inner: Arc<dyn ModuleStore>, mode: AccessMode) -> Self {
        Self { inner, mode }
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl ModuleStore for ModeGuard {
    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.read_file(path)
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let action = format!("write {} ({} bytes)", path.display(), contents.len());
        if self.mode.permits(&action)? {
            self.inner.write_file(path, contents)?;
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), StoreError> {
        if self.mode.permits(&format!("remove {}", path.display()))? {
            self.inner.remove_file(path)?;
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> Result<bool, StoreError> {
        self.inner.exists(path)
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        self.inner.list_files(dir)
    }

    fn set_executable(&self, path: &Path) -> Result<(), StoreError> {
        if self.mode.permits(&format!("chmod +x {}", path.display()))? {
            self.inner.set_executable(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
