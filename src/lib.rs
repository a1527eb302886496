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

//! KCtrl config manager
//!
//! Config persistence for the KCtrl key remapping module on rooted Android
//! devices. The module lives under `/data/adb/modules/kctrl` and reads a
//! single `config.txt` plus one shell script per key event.
//!
//! # Features
//!
//! - **Config codec:** Lenient `key=value` decoding with line diagnostics,
//!   legacy base64 documents and deterministic re-encoding
//! - **Device reconciliation:** Path or name matching with same-name groups
//!   and a guaranteed selection
//! - **Key bindings:** Script files created and deleted with their mappings
//! - **Privileged shell:** One framed `su` session or a shell per command,
//!   both with timeouts and cancellation
//! - **Safe writes:** Timestamped backups, rollback and validation before
//!   every config change
//! - **Packages:** Zip export and import of the config and its scripts
//!
//! # Architecture
//!
//! - **`core`:** Types, codec, reconciliation and input validation (no I/O)
//! - **`shell`:** Command runners for the privileged shell
//! - **`store`:** File access to the module directory, local or through root
//! - **`config`:** Backups, transactions, the repository, save queue and packages
//! - **`module`:** Device and key scanning, service control and log reports
//!
//! # Examples
//!
//! ## Decoding a config document
//!
//! ```
//! use kctrl_config::core::decode_document;
//!
//! let report = decode_document("device=\"gpio-keys\"|/dev/input/event3\nenable_log=1\n");
//! assert_eq!(report.state.device_tokens.len(), 2);
//! assert!(report.state.settings.enable_log);
//! ```
//!
//! ## Loading against the devices present
//!
//! ```no_run
//! use kctrl_config::config::{ConfigManager, ConfigRepository, ModulePaths};
//! use kctrl_config::module::ShellDeviceScanner;
//! use kctrl_config::shell::{CommandRunner, ShellCommand, SuSession};
//! use kctrl_config::store::RootModuleStore;
//! use std::{sync::Arc, time::Duration};
//!
//! let shell: Arc<dyn CommandRunner> =
//!     Arc::new(SuSession::new(ShellCommand::default(), Duration::from_secs(30)));
//! let manager = ConfigManager::new(
//!     Arc::new(RootModuleStore::new(shell.clone())),
//!     ModulePaths::default(),
//! );
//! let repo = ConfigRepository::new(manager);
//!
//! let snapshot = repo.load(&ShellDeviceScanner::new(shell))?;
//! for device in snapshot.selected_devices() {
//!     println!("{} ({})", device.path, device.name);
//! }
//! # Ok::<(), kctrl_config::config::ConfigError>(())
//! ```

pub mod config;
pub mod core;
pub mod module;
pub mod shell;
pub mod store;

// Re-export commonly used types for convenience
pub use core::{DeviceSelection, EventType, KeyBinding, ModuleSettings, Thresholds};
