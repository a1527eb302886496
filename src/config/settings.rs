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

//! Tool settings loaded from a TOML file.
//!
//! These configure the tool itself (where the module lives, how to get a
//! root shell, write batching), not the module.

use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    config::{paths::DEFAULT_MODULE_PATH, ConfigError, ModulePaths},
    shell::ShellCommand,
    store::AccessMode,
};

/// Commented settings file matching [`AppSettings::default`].
pub const DEFAULT_SETTINGS: &str = r#"# kctrl-config settings

# Module install directory
module_path = "/data/adb/modules/kctrl"

# live, read-only or dry-run
access_mode = "live"

[shell]
# Program that provides a root shell
program = "su"
args = []
# Keep one shell open for all commands instead of one per command
session = true
# Seconds before a command is abandoned and its shell killed
timeout_secs = 30

[save]
# Quiet period before queued config writes are flushed
debounce_ms = 1000
# Config backups kept in <module>/backups
backups_to_keep = 10

[scan]
# Seconds to wait for a key press during key detection
key_timeout_secs = 30
# Milliseconds to let kfind flush its result file
settle_ms = 2000
"#;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellSettings {
    pub program: String,
    pub args: Vec<String>,
    pub session: bool,
    pub timeout_secs: u64,
}

impl Default for ShellSettings {
    fn default() -> Self {
        let command = ShellCommand::default();
        Self {
            program: command.program,
            args: command.args,
            session: true,
            timeout_secs: 30,
        }
    }
}

impl ShellSettings {
    pub fn command(&self) -> ShellCommand {
        ShellCommand {
            program: self.program.clone(),
            args: self.args.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SaveSettings {
    pub debounce_ms: u64,
    pub backups_to_keep: usize,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 1000,
            backups_to_keep: 10,
        }
    }
}

impl SaveSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanSettings {
    pub key_timeout_secs: u64,
    pub settle_ms: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            key_timeout_secs: 30,
            settle_ms: 2000,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub module_path: PathBuf,
    pub access_mode: AccessMode,
    pub shell: ShellSettings,
    pub save: SaveSettings,
    pub scan: ScanSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from(DEFAULT_MODULE_PATH),
            access_mode: AccessMode::Live,
            shell: ShellSettings::default(),
            save: SaveSettings::default(),
            scan: ScanSettings::default(),
        }
    }
}

impl AppSettings {
    pub fn module_paths(&self) -> ModulePaths {
        ModulePaths::new(&self.module_path)
    }

    /// Parses settings from TOML text.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Settings {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Loads settings from `path`, expanding a leading `~`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let path = expand_path(path);
        let content = fs::read_to_string(&path)?;
        let settings = Self::from_toml(&content, &path)?;
        tracing::debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }
}

/// Expands `~` and environment variables in a user supplied path.
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(raw) => match shellexpand::full(raw) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
        },
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings_text_matches_defaults() {
        let parsed = AppSettings::from_toml(DEFAULT_SETTINGS, Path::new("default")).unwrap();
        assert_eq!(parsed, AppSettings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed = AppSettings::from_toml(
            "module_path = \"/sdcard/kctrl\"\n[shell]\nsession = false\n",
            Path::new("partial"),
        )
        .unwrap();

        assert_eq!(parsed.module_path, PathBuf::from("/sdcard/kctrl"));
        assert!(!parsed.shell.session);
        assert_eq!(parsed.shell.program, "su");
        assert_eq!(parsed.save.debounce(), Duration::from_secs(1));
    }

    #[test]
    fn test_access_mode_from_toml() {
        let parsed =
            AppSettings::from_toml("access_mode = \"dry-run\"\n", Path::new("mode")).unwrap();
        assert_eq!(parsed.access_mode, AccessMode::DryRun);
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let result = AppSettings::from_toml("module_path = [", Path::new("/etc/kctrl.toml"));
        match result {
            Err(ConfigError::Settings { path, .. }) => {
                assert_eq!(path, PathBuf::from("/etc/kctrl.toml"))
            }
            other => panic!("Expected Settings error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.toml");
        fs::write(&path, "[save]\nbackups_to_keep = 3\n").unwrap();

        let settings = AppSettings::load(&path).unwrap();
        assert_eq!(settings.save.backups_to_keep, 3);
    }
}
