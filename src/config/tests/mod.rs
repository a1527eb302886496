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

//! Config module tests
//!
//! Contains test suites for:
//! - Backups and transactions
//! - Repository load and the two save paths
//! - Package export and import
//! - The save queue
//!
//! Everything runs on a temporary module directory through the local store.

use std::sync::Arc;
use tempfile::TempDir;

use crate::{
    config::{ConfigManager, ModulePaths},
    store::LocalModuleStore,
};


/// Empty module directory and a manager over it.
pub(crate) fn module_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().unwrap();
    let manager = ConfigManager::new(
        Arc::new(LocalModuleStore::new()),
        ModulePaths::new(temp_dir.path()),
    );
    (temp_dir, manager)
}
