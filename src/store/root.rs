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

//! Store that reaches the module directory through the privileged shell
//!
//! File content always crosses the shell as base64, in both directions, so
//! arbitrary bytes and non-ASCII text survive quoting and line handling.
//! Paths are passed as single-quoted words.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    shell::{quote, CommandRunner},
    store::{ModuleStore, StoreError},
};

/// Printed instead of content when the requested file does not exist.
const MISSING_MARKER: &str = "__KCTRL_MISSING__";

pub struct RootModuleStore {
    runner: Arc<dyn CommandRunner>,
}

impl RootModuleStore {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }
}

fn shell_path(path: &Path) -> Result<String, StoreError> {
    path.to_str()
        .map(quote)
        .ok_or_else(|| StoreError::InvalidPath(path.to_path_buf()))
}

impl ModuleStore for RootModuleStore {
    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        let p = shell_path(path)?;
        let output = self.runner.execute(&format!(
            "if [ -f {p} ]; then base64 {p}; else echo {MISSING_MARKER}; fi"
        ))?;

        if output == MISSING_MARKER {
            return Ok(None);
        }

        let compact: String = output.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map(Some)
            .map_err(|e| StoreError::Transfer {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        let p = shell_path(path)?;
        let parent = match path.parent() {
            Some(parent) => shell_path(parent)?,
            None => return Err(StoreError::InvalidPath(path.to_path_buf())),
        };

        let encoded = STANDARD.encode(contents);
        self.runner.execute(&format!(
            "mkdir -p {parent} && echo '{encoded}' | base64 -d > {p}"
        ))?;

        tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote file through root shell");
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), StoreError> {
        self.runner.execute(&format!("rm -f {}", shell_path(path)?))?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> Result<bool, StoreError> {
        let output = self
            .runner
            .execute(&format!("test -e {} && echo 1 || echo 0", shell_path(path)?))?;
        Ok(output == "1")
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let d = shell_path(dir)?;
        let output = self
            .runner
            .execute(&format!("if [ -d {d} ]; then find {d} -type f; fi"))?;

        let mut files: Vec<PathBuf> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();
        files.sort();
        Ok(files)
    }

    fn set_executable(&self, path: &Path) -> Result<(), StoreError> {
        self.runner.execute(&format!("chmod +x {}", shell_path(path)?))?;
        Ok(())
    }
}
