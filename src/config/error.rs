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

use std::path::PathBuf;
use thiserror::Error;

use crate::{
    core::{BindingError, SelectionError, ValidationError},
    module::ScanError,
    store::StoreError,
};

/// Errors that can occur during configuration management.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Module file access failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Backup file does not exist.
    #[error("Backup not found: {0}")]
    NotFound(PathBuf),
    /// Failed to create or restore a backup.
    #[error("Failed to create backup: {0}")]
    BackupFailed(String),
    /// Document did not pass validation.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
    /// Device selection edit was rejected.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// Key binding edit was rejected.
    #[error(transparent)]
    Binding(#[from] BindingError),
    /// A name failed input validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    /// Device discovery failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
    /// Settings file could not be parsed.
    #[error("Invalid settings file {path}: {message}")]
    Settings { path: PathBuf, message: String },
    /// Zip archive could not be read or written.
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    /// Archive entry would land outside the module directory.
    #[error("Unsafe archive entry: {0}")]
    UnsafeEntry(String),
    /// Archive contains neither a config nor any script.
    #[error("Archive contains no config.txt and no scripts/ entries")]
    EmptyArchive,
    /// Background writer stopped or a queued write failed.
    #[error("Save failed: {0}")]
    SaveFailed(String),
    /// Generic I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
