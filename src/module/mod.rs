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

//! Talking to the device and the KCtrl service
//!
//! Everything here runs commands on the privileged shell:
//! - [`scanner`]: input device discovery
//! - [`keyscan`]: key code detection with the module's `kfind` helper
//! - [`service`]: service status, start/stop and diagnostics
//!
//! Output parsing is kept in plain functions so it can be tested on
//! captured text.

pub mod keyscan;
pub mod scanner;
pub mod service;

pub use keyscan::{KeyScanner, ScannedKey};
pub use scanner::{DeviceSource, ShellDeviceScanner, StaticDevices};
pub use service::{ModuleInfo, ServiceController, ServiceError, ServiceStatus};

use std::path::PathBuf;
use thiserror::Error;

use crate::shell::ShellError;

/// Key and device detection errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Shell(#[from] ShellError),

    #[error("Key detection tool not found: {0}")]
    ToolMissing(PathBuf),

    #[error("Key detection tool is not executable: {0}")]
    ToolNotExecutable(PathBuf),

    /// `kfind` ended without writing its result file
    #[error("Key detection produced no result")]
    NoOutput,

    #[error("No key press detected")]
    NoKeyDetected,

    #[error("Unrecognised key detection output: {0}")]
    Unparseable(String),
}

#[cfg(test)]
mod tests;
