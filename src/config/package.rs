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

//! Zip export and import of the config and its scripts
//!
//! Archive layout:
//! ```text
//! config.txt
//! scripts/<relative path>
//! ```
//! The config travels byte-for-byte, it is never decoded on the way.

use atomic_write_file::AtomicWriteFile;
use std::{
    fs::File,
    io::{Cursor, Read, Seek, Write},
    path::{Path, PathBuf},
};
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

use crate::{
    config::{
        paths::{CONFIG_FILE_NAME, SCRIPTS_DIR_NAME},
        ConfigError, ConfigManager,
    },
    core::document::DEFAULT_DOCUMENT,
};

/// What an export put into the archive.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExportSummary {
    /// The module had no config, the default document was exported instead
    pub default_config: bool,
    /// Script entries written, as archive paths
    pub scripts: Vec<String>,
    /// Empty script files left out
    pub skipped: Vec<String>,
}

/// What an import wrote into the module.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ImportSummary {
    pub config_imported: bool,
    /// Script files written, as archive paths
    pub scripts: Vec<String>,
    /// Entries outside `config.txt` and `scripts/`
    pub ignored: Vec<String>,
}

/// Writes the config and every non-empty script into a zip archive.
pub fn export_package<W: Write + Seek>(
    manager: &ConfigManager,
    writer: W,
) -> Result<ExportSummary, ConfigError> {
    let mut summary = ExportSummary::default();
    let mut zip = ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let config = match manager.read_config_bytes()? {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => {
            summary.default_config = true;
            DEFAULT_DOCUMENT.as_bytes().to_vec()
        }
    };
    zip.start_file(CONFIG_FILE_NAME, options)?;
    zip.write_all(&config)?;

    let paths = manager.paths();
    for file in manager.store().list_files(&paths.scripts_dir())? {
        let Some(entry_name) = paths.relative(&file) else {
            tracing::warn!(path = %file.display(), "Skipping script with unsupported name");
            continue;
        };
        match manager.store().read_file(&file)? {
            Some(content) if !content.is_empty() => {
                zip.start_file(entry_name.as_str(), options)?;
                zip.write_all(&content)?;
                summary.scripts.push(entry_name);
            }
            _ => summary.skipped.push(entry_name),
        }
    }

    zip.finish()?;
    tracing::info!(
        scripts = summary.scripts.len(),
        skipped = summary.skipped.len(),
        "Exported config package"
    );
    Ok(summary)
}

/// Exports to `path`. The archive appears complete or not at all.
pub fn export_to_file(manager: &ConfigManager, path: &Path) -> Result<ExportSummary, ConfigError> {
    let mut buffer = Cursor::new(Vec::new());
    let summary = export_package(manager, &mut buffer)?;

    let mut file = AtomicWriteFile::options().open(path)?;
    file.write_all(buffer.get_ref())?;
    file.commit()?;
    Ok(summary)
}

enum Entry {
    Config(Vec<u8>),
    Script {
        name: String,
        path: PathBuf,
        content: Vec<u8>,
    },
}

/// Writes the archive's config and scripts into the module.
///
/// Every entry is checked before anything is written. Scripts are written
/// first and marked executable, then `config.txt` is committed through a
/// transaction, so the previous config is backed up.
///
/// # Errors
///
/// - `ConfigError::UnsafeEntry` for absolute paths or `..` components
/// - `ConfigError::EmptyArchive` when neither a config nor a script is present
pub fn import_package<R: Read + Seek>(
    manager: &ConfigManager,
    reader: R,
) -> Result<ImportSummary, ConfigError> {
    let mut archive = ZipArchive::new(reader)?;
    let mut summary = ImportSummary::default();
    let mut entries = Vec::new();
    let scripts_prefix = format!("{}/", SCRIPTS_DIR_NAME);

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();

        if name.starts_with('/') || name.contains('\\') || name.split('/').any(|p| p == "..") {
            return Err(ConfigError::UnsafeEntry(name));
        }

        if name == CONFIG_FILE_NAME {
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            entries.push(Entry::Config(content));
        } else if name.starts_with(&scripts_prefix) {
            let path = manager
                .paths()
                .resolve(&name)
                .ok_or_else(|| ConfigError::UnsafeEntry(name.clone()))?;
            let mut content = Vec::new();
            file.read_to_end(&mut content)?;
            entries.push(Entry::Script {
                name,
                path,
                content,
            });
        } else {
            tracing::warn!(entry = %name, "Ignoring unrecognised archive entry");
            summary.ignored.push(name);
        }
    }

    if entries.is_empty() {
        return Err(ConfigError::EmptyArchive);
    }

    let mut config = None;
    for entry in entries {
        match entry {
            Entry::Config(content) => config = Some(content),
            Entry::Script {
                name,
                path,
                content,
            } => {
                manager.store().write_file(&path, &content)?;
                manager.store().set_executable(&path)?;
                summary.scripts.push(name);
            }
        }
    }

    if let Some(content) = config {
        manager.begin_transaction()?.commit_bytes(&content)?;
        summary.config_imported = true;
    }

    tracing::info!(
        config = summary.config_imported,
        scripts = summary.scripts.len(),
        "Imported config package"
    );
    Ok(summary)
}

pub fn import_from_file(manager: &ConfigManager, path: &Path) -> Result<ImportSummary, ConfigError> {
    import_package(manager, File::open(path)?)
}
