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

//! Direct filesystem store with atomic writes.

use atomic_write_file::AtomicWriteFile;
use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use crate::store::{ModuleStore, StoreError};

/// Store backed by the local filesystem.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// crash never leaves a half-written config behind.
#[derive(Clone, Debug, Default)]
pub struct LocalModuleStore;

impl LocalModuleStore {
    pub fn new() -> Self {
        Self
    }
}

fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), StoreError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&entry.path(), out)?;
        } else if file_type.is_file() {
            out.push(entry.path());
        }
    }
    Ok(())
}

impl ModuleStore for LocalModuleStore {
    fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = AtomicWriteFile::options().open(path)?;
        file.write_all(contents)?;
        file.commit()?;

        tracing::debug!(path = %path.display(), bytes = contents.len(), "Wrote file");
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, path: &Path) -> Result<bool, StoreError> {
        Ok(path.exists())
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
        let mut files = Vec::new();
        if dir.is_dir() {
            walk(dir, &mut files)?;
        }
        files.sort();
        Ok(files)
    }

    #[cfg(unix)]
    fn set_executable(&self, path: &Path) -> Result<(), StoreError> {
        use std::os::unix::fs::PermissionsExt;

        let mut permissions = fs::metadata(path)?.permissions();
        permissions.set_mode(permissions.mode() | 0o755);
        fs::set_permissions(path, permissions)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn set_executable(&self, _path: &Path) -> Result<(), StoreError> {
        Ok(())
    }
}
