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

//! Config write transactions with automatic backups

use std::path::{Path, PathBuf};

use crate::config::{
    validator::{ConfigValidator, ValidationLevel},
    ConfigError, ConfigManager,
};

/// Whole-document write with a backup taken up front.
///
/// # Lifecycle
///
/// 1. `begin()` - Backs up the current document (if there is one)
/// 2. Caller renders the new document in memory
/// 3. `commit()` - Writes it, or `rollback()` - Restores the backup
///
/// # Example
///
/// ```
/// use kctrl_config::config::{ConfigManager, ConfigTransaction, ModulePaths};
/// use kctrl_config::store::LocalModuleStore;
/// use std::sync::Arc;
///
/// let dir = tempfile::tempdir()?;
/// let manager = ConfigManager::new(Arc::new(LocalModuleStore::new()), ModulePaths::new(dir.path()));
///
/// let tx = ConfigTransaction::begin(&manager)?;
/// tx.commit("click_threshold=120\n")?;
/// # Ok::<(), kctrl_config::config::ConfigError>(())
/// ```
pub struct ConfigTransaction<'a> {
    manager: &'a ConfigManager,
    backup_path: Option<PathBuf>,
}

impl<'a> ConfigTransaction<'a> {
    /// Begins a new transaction by creating a timestamped backup.
    ///
    /// The backup exists before anything is written, so there is always a
    /// rollback point. A module without a config gets no backup; rolling
    /// back then removes whatever was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the current document cannot be read or the
    /// backup cannot be written. Nothing has been modified in that case.
    pub fn begin(manager: &'a ConfigManager) -> Result<Self, ConfigError> {
        let backup_path = manager.create_timestamped_backup()?;
        Ok(Self {
            manager,
            backup_path,
        })
    }

    /// Backup taken by `begin()`, if the module had a config.
    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    /// Validates the document and commits it if it has no errors.
    ///
    /// Warnings are logged and do not block the write.
    ///
    /// # Errors
    ///
    /// * `ConfigError::ValidationFailed` - The document has error-level issues
    /// * Any error from [`commit`](Self::commit)
    pub fn commit_with_validation(self, new_content: &str) -> Result<(), ConfigError> {
        let report = ConfigValidator::new().validate_config(new_content);

        if report.has_errors() {
            let errors: Vec<String> = report
                .issues
                .iter()
                .filter(|i| i.validation_level == ValidationLevel::Error)
                .map(ToString::to_string)
                .collect();
            for error in &errors {
                tracing::error!("{}", error);
            }
            return Err(ConfigError::ValidationFailed(format!(
                "{} validation error(s): {}",
                errors.len(),
                errors.join("; ")
            )));
        }

        for issue in report
            .issues
            .iter()
            .filter(|i| i.validation_level == ValidationLevel::Warning)
        {
            tracing::warn!("{}", issue);
        }

        self.commit(new_content)
    }

    /// Writes `new_content` as the new document.
    ///
    /// Consumes the transaction. The backup stays in place and old backups
    /// beyond the manager's limit are pruned afterwards.
    pub fn commit(self, new_content: &str) -> Result<(), ConfigError> {
        self.commit_bytes(new_content.as_bytes())
    }

    /// Writes raw bytes as the new document, used for verbatim imports.
    pub fn commit_bytes(self, new_content: &[u8]) -> Result<(), ConfigError> {
        let config_path = self.manager.paths().config_file();
        self.manager.store().write_file(&config_path, new_content)?;
        tracing::info!(
            path = %config_path.display(),
            bytes = new_content.len(),
            "Config written"
        );

        let keep = self.manager.backups_to_keep();
        if keep > 0 {
            if let Err(e) = self.manager.cleanup_old_backups(keep) {
                tracing::warn!("Failed to prune old backups: {}", e);
            }
        }
        Ok(())
    }

    /// Restores the document as it was when the transaction began.
    ///
    /// Borrows `self`, so a failed rollback can be retried.
    ///
    /// # Errors
    ///
    /// * `ConfigError::NotFound` - The backup file disappeared
    /// * Store errors from reading the backup or writing the config
    pub fn rollback(&self) -> Result<(), ConfigError> {
        let config_path = self.manager.paths().config_file();
        match &self.backup_path {
            Some(backup_path) => {
                let content = self
                    .manager
                    .store()
                    .read_file(backup_path)?
                    .ok_or_else(|| ConfigError::NotFound(backup_path.clone()))?;
                self.manager.store().write_file(&config_path, &content)?;
            }
            None => self.manager.store().remove_file(&config_path)?,
        }
        tracing::info!(path = %config_path.display(), "Config rolled back");
        Ok(())
    }
}
