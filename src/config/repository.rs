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

//! Read-modify-write access to the module config
//!
//! [`ConfigRepository`] is the single owner of the config document. Callers
//! get immutable [`ConfigSnapshot`]s and hand back whole settings or
//! binding sets; every write re-reads the document, regenerates the part
//! it owns and commits the full text through a [`ConfigTransaction`].
//!
//! The two write paths split the document between them:
//! - settings saves regenerate everything except the `script_` lines
//! - key saves regenerate only the `script_` lines and validate the names
//!   they write
//!
//! [`ConfigTransaction`]: crate::config::ConfigTransaction

use std::path::PathBuf;

use crate::{
    config::{ConfigError, ConfigManager, ConfigValidator, ModulePaths, ValidationLevel},
    core::{
        document::{extract_script_lines, render_document, replace_script_block},
        parser::{decode_document, decode_legacy},
        reconcile::{apply_tokens, fallback_devices, set_match_mode, toggle_selection},
        validator::validate_binding,
        DecodeReport, DeviceSelection, Diagnostic, DocumentFormat, EventType, KeyBindingSet,
        MatchMode, ModuleSettings, ScriptChange, SCRIPT_STUB,
    },
    module::DeviceSource,
    store::ModuleStore,
};

/// Decoded config reconciled against the devices present right now.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigSnapshot {
    pub settings: ModuleSettings,
    pub devices: Vec<DeviceSelection>,
    pub bindings: KeyBindingSet,
    /// Lines the decoder skipped or guessed at
    pub diagnostics: Vec<Diagnostic>,
    pub format: DocumentFormat,
    /// False when the module has no config file yet
    pub exists: bool,
}

impl ConfigSnapshot {
    pub fn selected_devices(&self) -> impl Iterator<Item = &DeviceSelection> {
        self.devices.iter().filter(|d| d.is_selected)
    }
}

pub struct ConfigRepository {
    manager: ConfigManager,
}

impl ConfigRepository {
    pub fn new(manager: ConfigManager) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &ConfigManager {
        &self.manager
    }

    pub fn paths(&self) -> &ModulePaths {
        self.manager.paths()
    }

    fn store(&self) -> &dyn ModuleStore {
        self.manager.store().as_ref()
    }

    /// Current document as stored, empty if missing.
    pub fn read_document(&self) -> Result<String, ConfigError> {
        Ok(self.manager.read_config()?.unwrap_or_default())
    }

    /// Current document as plain text, legacy documents decoded.
    fn read_plain_document(&self) -> Result<String, ConfigError> {
        let raw = self.read_document()?;
        Ok(decode_legacy(&raw).unwrap_or(raw))
    }

    /// Decodes the current document without looking at devices.
    pub fn decode(&self) -> Result<DecodeReport, ConfigError> {
        Ok(decode_document(&self.read_document()?))
    }

    /// Current key bindings.
    pub fn bindings(&self) -> Result<KeyBindingSet, ConfigError> {
        Ok(KeyBindingSet::from(self.decode()?.state.bindings))
    }

    /// Decodes the document and reconciles it with the devices `source` finds.
    ///
    /// An empty scan falls back to placeholder devices, and at least one
    /// device is always selected afterwards.
    pub fn load(&self, source: &dyn DeviceSource) -> Result<ConfigSnapshot, ConfigError> {
        let stored = self.manager.read_config()?;
        let exists = stored.is_some();
        let report = decode_document(stored.as_deref().unwrap_or_default());

        for diagnostic in &report.diagnostics {
            tracing::warn!("config {}", diagnostic);
        }

        let mut devices = source.scan_devices()?;
        if devices.is_empty() {
            tracing::warn!("No input devices found, using placeholders");
            devices = fallback_devices();
        }
        apply_tokens(&mut devices, &report.state.device_tokens);

        Ok(ConfigSnapshot {
            settings: report.state.settings,
            devices,
            bindings: KeyBindingSet::from(report.state.bindings),
            diagnostics: report.diagnostics,
            format: report.format,
            exists,
        })
    }

    /// Rewrites the document from `settings` and `devices`, keeping its `script_` lines.
    ///
    /// The `script_` lines are copied as found, so nothing in them blocks
    /// the save. Validation issues are only logged here; script names are
    /// enforced by [`save_key_bindings`](Self::save_key_bindings).
    ///
    /// Returns the committed document.
    pub fn save_settings(
        &self,
        settings: &ModuleSettings,
        devices: &[DeviceSelection],
    ) -> Result<String, ConfigError> {
        let current = self.read_plain_document()?;
        let document = render_document(settings, devices, &extract_script_lines(&current));

        let report = ConfigValidator::new().validate_config(&document);
        for issue in report
            .issues
            .iter()
            .filter(|i| i.validation_level != ValidationLevel::Info)
        {
            tracing::warn!("config {}", issue);
        }

        self.manager.begin_transaction()?.commit(&document)?;
        Ok(document)
    }

    /// Regenerates the `script_` lines from `bindings`, keeping every other line.
    ///
    /// Returns the committed document.
    pub fn save_key_bindings(&self, bindings: &KeyBindingSet) -> Result<String, ConfigError> {
        for binding in bindings.iter() {
            validate_binding(binding)?;
        }
        let current = self.read_plain_document()?;
        let document = replace_script_block(&current, bindings.as_slice());
        self.write_document(&document)?;
        Ok(document)
    }

    /// Validates and commits a whole document.
    pub fn write_document(&self, document: &str) -> Result<(), ConfigError> {
        self.manager
            .begin_transaction()?
            .commit_with_validation(document)
    }

    /// Applies `edit` to the stored settings, normalizes the thresholds and saves.
    pub fn update_settings(
        &self,
        source: &dyn DeviceSource,
        edit: impl FnOnce(&mut ModuleSettings),
    ) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load(source)?;
        edit(&mut snapshot.settings);

        let normalized = snapshot.settings.thresholds.normalized();
        if normalized != snapshot.settings.thresholds {
            tracing::info!(?normalized, "Adjusted thresholds to keep them ordered");
            snapshot.settings.thresholds = normalized;
        }

        self.save_settings(&snapshot.settings, &snapshot.devices)?;
        Ok(snapshot)
    }

    /// Toggles the device at `index` and saves the selection.
    pub fn toggle_device(
        &self,
        source: &dyn DeviceSource,
        index: usize,
    ) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load(source)?;
        toggle_selection(&mut snapshot.devices, index)?;
        self.save_settings(&snapshot.settings, &snapshot.devices)?;
        Ok(snapshot)
    }

    /// Switches the device at `index` between path and name matching and saves.
    pub fn set_device_mode(
        &self,
        source: &dyn DeviceSource,
        index: usize,
        mode: MatchMode,
    ) -> Result<ConfigSnapshot, ConfigError> {
        let mut snapshot = self.load(source)?;
        set_match_mode(&mut snapshot.devices, index, mode)?;
        self.save_settings(&snapshot.settings, &snapshot.devices)?;
        Ok(snapshot)
    }

    /// Binds a new key with all four default scripts.
    pub fn add_key(&self, code: u32) -> Result<KeyBindingSet, ConfigError> {
        let mut bindings = self.bindings()?;
        let changes = bindings.add(code)?;
        self.apply_script_changes(&changes)?;
        self.save_key_bindings(&bindings)?;
        tracing::info!(code, "Added key");
        Ok(bindings)
    }

    /// Unbinds a key and deletes its script files.
    pub fn remove_key(&self, code: u32) -> Result<KeyBindingSet, ConfigError> {
        let mut bindings = self.bindings()?;
        let changes = bindings.remove(code)?;
        self.apply_script_changes(&changes)?;
        self.save_key_bindings(&bindings)?;
        tracing::info!(code, "Removed key");
        Ok(bindings)
    }

    /// Maps or unmaps one event of a key.
    ///
    /// The script file is created or deleted right away and the `script_`
    /// line follows in the same save.
    pub fn set_event(
        &self,
        code: u32,
        event: EventType,
        enabled: bool,
    ) -> Result<KeyBindingSet, ConfigError> {
        let mut bindings = self.bindings()?;
        let change = bindings.set_event(code, event, enabled)?;
        self.apply_script_changes(&[change])?;
        self.save_key_bindings(&bindings)?;
        Ok(bindings)
    }

    /// Creates missing scripts of mapped events and deletes scripts of unmapped ones.
    pub fn sync_scripts(&self, code: u32) -> Result<Vec<ScriptChange>, ConfigError> {
        let changes = self.bindings()?.sync_changes(code)?;
        self.apply_script_changes(&changes)?;
        Ok(changes)
    }

    pub fn script_path(&self, code: u32, event: EventType) -> PathBuf {
        self.paths().script_file(code, event)
    }

    /// Script content, or the stub if the file does not exist.
    pub fn read_script(&self, code: u32, event: EventType) -> Result<String, ConfigError> {
        let path = self.script_path(code, event);
        Ok(self
            .store()
            .read_text(&path)?
            .unwrap_or_else(|| SCRIPT_STUB.to_string()))
    }

    /// Replaces a script and marks it executable.
    pub fn write_script(&self, code: u32, event: EventType, content: &str) -> Result<(), ConfigError> {
        let path = self.script_path(code, event);
        self.store().write_file(&path, content.as_bytes())?;
        self.store().set_executable(&path)?;
        tracing::info!(path = %path.display(), "Script saved");
        Ok(())
    }

    /// Writes the stub unless the script already exists. Returns whether it wrote.
    pub fn ensure_script(&self, code: u32, event: EventType) -> Result<bool, ConfigError> {
        let path = self.script_path(code, event);
        if self.store().exists(&path)? {
            return Ok(false);
        }
        self.store().write_file(&path, SCRIPT_STUB.as_bytes())?;
        self.store().set_executable(&path)?;
        tracing::debug!(path = %path.display(), "Created script stub");
        Ok(true)
    }

    /// Performs the file side of binding edits.
    pub fn apply_script_changes(&self, changes: &[ScriptChange]) -> Result<(), ConfigError> {
        for change in changes {
            match *change {
                ScriptChange::Create { code, event } => {
                    self.ensure_script(code, event)?;
                }
                ScriptChange::Delete { code, event } => {
                    let path = self.script_path(code, event);
                    self.store().remove_file(&path)?;
                    tracing::debug!(path = %path.display(), "Deleted script");
                }
            }
        }
        Ok(())
    }
}
