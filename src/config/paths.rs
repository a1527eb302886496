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

//! Well-known files of the KCtrl module directory.

use std::path::{Component, Path, PathBuf};

use crate::core::EventType;

/// Install location of the module on a rooted device.
pub const DEFAULT_MODULE_PATH: &str = "/data/adb/modules/kctrl";

pub const CONFIG_FILE_NAME: &str = "config.txt";
pub const SCRIPTS_DIR_NAME: &str = "scripts";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModulePaths {
    root: PathBuf,
}

impl Default for ModulePaths {
    fn default() -> Self {
        Self::new(DEFAULT_MODULE_PATH)
    }
}

impl ModulePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join(SCRIPTS_DIR_NAME)
    }

    /// Default script file of `event` on key `code`.
    pub fn script_file(&self, code: u32, event: EventType) -> PathBuf {
        self.scripts_dir().join(event.script_file_name(code))
    }

    /// PID of the running service.
    pub fn pid_file(&self) -> PathBuf {
        self.root.join("mpid.txt")
    }

    pub fn service_script(&self) -> PathBuf {
        self.root.join("service.sh")
    }

    pub fn module_prop(&self) -> PathBuf {
        self.root.join("module.prop")
    }

    /// Key detection helper shipped with the module.
    pub fn kfind(&self) -> PathBuf {
        self.root.join("kfind")
    }

    /// Result file written by `kfind`.
    pub fn kfind_output(&self) -> PathBuf {
        self.root.join("kfind.txt")
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join("klog.log")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// `path` relative to the module root with `/` separators.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Option<Vec<&str>> = rel
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect();
        parts.filter(|p| !p.is_empty()).map(|p| p.join("/"))
    }

    /// Resolves a `/`-separated relative path, refusing anything that
    /// could leave the module directory.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        if relative.is_empty() || relative.starts_with('/') || relative.contains('\\') {
            return None;
        }
        let mut path = self.root.clone();
        for part in relative.split('/') {
            if part.is_empty() || part == "." || part == ".." {
                return None;
            }
            path.push(part);
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let paths = ModulePaths::default();
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/data/adb/modules/kctrl/config.txt")
        );
        assert_eq!(
            paths.script_file(735, EventType::LongPress),
            PathBuf::from("/data/adb/modules/kctrl/scripts/long_press_735.sh")
        );
        assert_eq!(paths.pid_file(), PathBuf::from("/data/adb/modules/kctrl/mpid.txt"));
    }

    #[test]
    fn test_relative_and_resolve() {
        let paths = ModulePaths::new("/m");
        let script = paths.script_file(1, EventType::Click);

        assert_eq!(paths.relative(&script).as_deref(), Some("scripts/click_1.sh"));
        assert_eq!(paths.relative(Path::new("/elsewhere/x")), None);
        assert_eq!(paths.resolve("scripts/click_1.sh"), Some(script));
    }

    #[test]
    fn test_resolve_rejects_escapes() {
        let paths = ModulePaths::new("/m");
        assert_eq!(paths.resolve("../etc/passwd"), None);
        assert_eq!(paths.resolve("scripts/../../x"), None);
        assert_eq!(paths.resolve("/etc/passwd"), None);
        assert_eq!(paths.resolve("scripts//x"), None);
        assert_eq!(paths.resolve(""), None);
    }
}
