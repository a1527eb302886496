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

//! src/core/bindings.rs
//!
//! Key binding list and the script file effects of editing it
//!
//! Editing a binding never touches the filesystem. Each edit returns the
//! [`ScriptChange`]s that keep the scripts directory in step with the
//! bindings, and the caller applies them through its store.

use thiserror::Error;

use crate::core::{
    document::render_script_lines,
    types::{EventType, KeyBinding},
    validator::{validate_key_code, ValidationError},
};

#[derive(Debug, Error, PartialEq)]
pub enum BindingError {
    #[error("Key {0} already exists")]
    DuplicateKey(u32),

    #[error("Key {0} is not configured")]
    UnknownKey(u32),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A script file operation implied by a binding edit.
///
/// Files are always addressed by their default name `<event>_<code>.sh`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScriptChange {
    /// Create the stub unless the file already exists
    Create { code: u32, event: EventType },
    /// Remove the file if present
    Delete { code: u32, event: EventType },
}

impl ScriptChange {
    pub fn file_name(&self) -> String {
        match self {
            ScriptChange::Create { code, event } | ScriptChange::Delete { code, event } => {
                event.script_file_name(*code)
            }
        }
    }
}

/// Ordered set of key bindings, unique by key code.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyBindingSet {
    bindings: Vec<KeyBinding>,
}

impl KeyBindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, code: u32) -> Option<&KeyBinding> {
        self.bindings.iter().find(|b| b.code == code)
    }

    pub fn contains(&self, code: u32) -> bool {
        self.get(code).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn as_slice(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// Adds `code` with all four events mapped to their default scripts.
    ///
    /// # Errors
    ///
    /// - `BindingError::Invalid` if the code is outside the input key range
    /// - `BindingError::DuplicateKey` if the code is already bound
    pub fn add(&mut self, code: u32) -> Result<Vec<ScriptChange>, BindingError> {
        validate_key_code(code)?;
        if self.contains(code) {
            return Err(BindingError::DuplicateKey(code));
        }

        self.bindings.push(KeyBinding::with_default_scripts(code));
        Ok(EventType::ALL
            .into_iter()
            .map(|event| ScriptChange::Create { code, event })
            .collect())
    }

    /// Removes `code` and returns deletions for all four script files.
    pub fn remove(&mut self, code: u32) -> Result<Vec<ScriptChange>, BindingError> {
        let idx = self
            .bindings
            .iter()
            .position(|b| b.code == code)
            .ok_or(BindingError::UnknownKey(code))?;
        self.bindings.remove(idx);

        Ok(EventType::ALL
            .into_iter()
            .map(|event| ScriptChange::Delete { code, event })
            .collect())
    }

    /// Maps or unmaps a single event of `code`.
    pub fn set_event(
        &mut self,
        code: u32,
        event: EventType,
        enabled: bool,
    ) -> Result<ScriptChange, BindingError> {
        let binding = self
            .bindings
            .iter_mut()
            .find(|b| b.code == code)
            .ok_or(BindingError::UnknownKey(code))?;

        if enabled {
            binding
                .scripts
                .entry(event)
                .or_insert_with(|| event.script_file_name(code));
            Ok(ScriptChange::Create { code, event })
        } else {
            binding.scripts.remove(&event);
            Ok(ScriptChange::Delete { code, event })
        }
    }

    /// Changes needed to make the scripts directory match `code`'s mappings.
    pub fn sync_changes(&self, code: u32) -> Result<Vec<ScriptChange>, BindingError> {
        let binding = self.get(code).ok_or(BindingError::UnknownKey(code))?;

        Ok(EventType::ALL
            .into_iter()
            .map(|event| match binding.script(event) {
                Some(name) if !name.is_empty() => ScriptChange::Create { code, event },
                _ => ScriptChange::Delete { code, event },
            })
            .collect())
    }

    /// `script_` lines for the current bindings.
    pub fn script_lines(&self) -> Vec<String> {
        render_script_lines(&self.bindings)
    }

    pub fn into_vec(self) -> Vec<KeyBinding> {
        self.bindings
    }
}

impl From<Vec<KeyBinding>> for KeyBindingSet {
    /// Later duplicates of a code are merged into the first binding.
    fn from(list: Vec<KeyBinding>) -> Self {
        let mut set = Self::new();
        for binding in list {
            match set.bindings.iter_mut().find(|b| b.code == binding.code) {
                Some(existing) => existing.scripts.extend(binding.scripts),
                None => set.bindings.push(binding),
            }
        }
        set
    }
}
