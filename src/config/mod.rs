// Copyright 2025 Eric Jingryd (tidynest@proton.me)
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

//! Configuration file management with safe writes
//!
//! Every change to `config.txt` is a whole-document write through a
//! [`ConfigTransaction`], which takes a timestamped backup first. All file
//! access goes through a [`ModuleStore`], so the same code runs over the
//! privileged shell and over a local directory.
//!
//! # Example
//!
//! ```
//! use kctrl_config::config::{ConfigManager, ModulePaths};
//! use kctrl_config::store::LocalModuleStore;
//! use std::sync::Arc;
//!
//! let dir = tempfile::tempdir()?;
//! let manager = ConfigManager::new(Arc::new(LocalModuleStore::new()), ModulePaths::new(dir.path()));
//!
//! manager.begin_transaction()?.commit("enable_log=1\n")?;
//! assert_eq!(manager.read_config()?.as_deref(), Some("enable_log=1\n"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod package;
pub mod paths;
pub mod repository;
pub mod save_queue;
pub mod settings;
pub mod transaction;
pub mod validator;

pub use error::ConfigError;
pub use package::{ExportSummary, ImportSummary};
pub use paths::ModulePaths;
pub use repository::{ConfigRepository, ConfigSnapshot};
pub use save_queue::SaveQueue;
pub use settings::AppSettings;
pub use transaction::ConfigTransaction;
pub use validator::{ConfigValidator, ValidationLevel, ValidationReport};

use chrono::Local;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::store::ModuleStore;

/// Backups kept when nothing else is configured.
pub const DEFAULT_BACKUPS_TO_KEEP: usize = 10;

/// Owns access to `config.txt` and its backups.
pub struct ConfigManager {
    store: Arc<dyn ModuleStore>,
    paths: ModulePaths,
    backups_to_keep: usize,
}

impl ConfigManager {
    pub fn new(store: Arc<dyn ModuleStore>, paths: ModulePaths) -> Self {
        Self {
            store,
            paths,
            backups_to_keep: DEFAULT_BACKUPS_TO_KEEP,
        }
    }

    /// Number of backups left after each commit. `0` keeps all of them.
    pub fn with_backups_to_keep(mut self, keep: usize) -> Self {
        self.backups_to_keep = keep;
        self
    }

    pub fn store(&self) -> &Arc<dyn ModuleStore> {
        &self.store
    }

    pub fn paths(&self) -> &ModulePaths {
        &self.paths
    }

    pub fn backups_to_keep(&self) -> usize {
        self.backups_to_keep
    }

    /// Raw document bytes, `None` if the module has no config yet.
    pub fn read_config_bytes(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        Ok(self.store.read_file(&self.paths.config_file())?)
    }

    /// Document text, `None` if the module has no config yet.
    pub fn read_config(&self) -> Result<Option<String>, ConfigError> {
        Ok(self.store.read_text(&self.paths.config_file())?)
    }

    /// Starts a write by backing up the current document.
    pub fn begin_transaction(&self) -> Result<ConfigTransaction<'_>, ConfigError> {
        ConfigTransaction::begin(self)
    }

    /// Copies the current document to `backups/config.txt.<timestamp>`.
    ///
    /// Returns `None` when there is no document to back up.
    pub(crate) fn create_timestamped_backup(&self) -> Result<Option<PathBuf>, ConfigError> {
        let Some(content) = self.read_config_bytes()? else {
            return Ok(None);
        };

        // YYYY-MM-DD_HHMMSS
        let timestamp = Local::now().format("%Y-%m-%d_%H%M%S").to_string();
        let existing = self.list_backups()?;

        let mut backup_path = self.backup_path_for(&timestamp);
        let mut suffix = 1;
        while existing.contains(&backup_path) {
            backup_path = self.backup_path_for(&format!("{}-{:03}", timestamp, suffix));
            suffix += 1;
        }

        self.store
            .write_file(&backup_path, &content)
            .map_err(|e| ConfigError::BackupFailed(format!("{}: {}", backup_path.display(), e)))?;

        tracing::debug!(backup = %backup_path.display(), "Created config backup");
        Ok(Some(backup_path))
    }

    fn backup_path_for(&self, stamp: &str) -> PathBuf {
        self.paths
            .backups_dir()
            .join(format!("{}.{}", paths::CONFIG_FILE_NAME, stamp))
    }

    /// Config backups, newest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let prefix = format!("{}.", paths::CONFIG_FILE_NAME);
        let mut backups: Vec<PathBuf> = self
            .store
            .list_files(&self.paths.backups_dir())?
            .into_iter()
            .filter(|path| {
                path.parent() == Some(self.paths.backups_dir().as_path())
                    && path
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|n| n.starts_with(&prefix))
            })
            .collect();

        backups.sort();
        backups.reverse();
        Ok(backups)
    }

    /// Replaces the config with a backup, backing up the current document first.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NotFound` if `backup` is not one of this module's backups
    pub fn restore_backup(&self, backup: &Path) -> Result<(), ConfigError> {
        if !self.list_backups()?.iter().any(|b| b == backup) {
            return Err(ConfigError::NotFound(backup.to_path_buf()));
        }
        let content = self
            .store
            .read_file(backup)?
            .ok_or_else(|| ConfigError::NotFound(backup.to_path_buf()))?;

        self.begin_transaction()?.commit_bytes(&content)?;
        tracing::info!(backup = %backup.display(), "Restored config from backup");
        Ok(())
    }

    /// Deletes all but the newest `keep` backups. Returns how many were removed.
    pub fn cleanup_old_backups(&self, keep: usize) -> Result<usize, ConfigError> {
        let backups = self.list_backups()?;
        let mut removed = 0;
        for old in backups.iter().skip(keep) {
            self.store.remove_file(old)?;
            removed += 1;
        }
        if removed > 0 {
            tracing::debug!(removed, keep, "Pruned old config backups");
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests;
